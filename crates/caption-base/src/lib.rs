mod backend;
mod error;
mod generator;
mod policy;
mod prompt;
mod request;

pub use backend::*;
pub use error::*;
pub use generator::*;
pub use policy::*;
pub use prompt::*;
pub use request::*;
