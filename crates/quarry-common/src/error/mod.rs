//! Error handling shared across quarry.
//!
//! Every crate defines its own `thiserror` enum; each of them maps onto
//! one of the stable [`ErrorCode`] kinds defined here.

mod codes;
mod config;

pub use codes::ErrorCode;
pub use config::ConfigError;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
