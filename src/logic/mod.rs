pub mod id_generator;
pub mod mutation;
pub mod patch;
pub mod resource;

pub use id_generator::*;
pub use mutation::*;
pub use patch::*;
pub use resource::*;
