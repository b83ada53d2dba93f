pub mod config;
pub mod error;
pub mod types;

pub use config::AnaConfig;
pub use error::{AnaError, Result};
pub use types::*;
