pub mod address;
pub mod error;
pub mod types;

pub use address::Address;
pub use error::{Error, Result};
pub use types::*;
