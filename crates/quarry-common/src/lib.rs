//! # quarry-common
//!
//! Error codes, configuration and constants shared by every quarry crate.
//!
//! This crate is the leaf of the workspace. It includes:
//!
//! - **Errors**: stable [`ErrorCode`] kinds and the configuration error type
//! - **Config**: TOML-loadable [`QuarryConfig`] with compiler, optimizer and
//!   session sections
//! - **Constants**: default dialect, alias prefix, join side qualifiers
//!
//! ## Example
//!
//! ```rust
//! use quarry_common::config::{IdentifierQuoting, QuarryConfig};
//! use quarry_common::error::ConfigResult;
//!
//! fn example() -> ConfigResult<()> {
//!     let config = QuarryConfig::builder()
//!         .dialect("postgres")
//!         .parameterize_literals(true)
//!         .identifier_quoting(IdentifierQuoting::AsNeeded)
//!         .build();
//!     config.validate()?;
//!     assert_eq!(config.compiler.dialect, "postgres");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;

// Re-export commonly used items at the crate root
pub use config::{CompilerConfig, IdentifierQuoting, OptimizerSettings, QuarryConfig, SessionSettings};
pub use constants::*;
pub use error::{ConfigError, ConfigResult, ErrorCode};
