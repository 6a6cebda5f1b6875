pub mod config;
pub mod error;

pub use config::StrataConfig;
pub use error::{Result, StrataError};
