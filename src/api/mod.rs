pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;

pub use auth::*;
pub use error::*;
pub use handlers::*;
pub use routes::*;
