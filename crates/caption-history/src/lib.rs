mod error;
mod record;
mod store;

pub use error::*;
pub use record::*;
pub use store::*;
