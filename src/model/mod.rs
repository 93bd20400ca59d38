pub mod graph;
pub mod identifier;
pub mod market_service;
pub mod market_user;
pub mod organization;
pub mod page;
pub mod service_provider;
pub mod validation;

pub use graph::*;
pub use identifier::*;
pub use market_service::*;
pub use market_user::*;
pub use organization::*;
pub use page::*;
pub use service_provider::*;
