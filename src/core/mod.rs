pub mod converter;
pub mod error;
pub mod types;

pub use converter::Converter;
pub use error::{Error, Result};
pub use types::Params;
