//! Configuration for quarry.
//!
//! This module provides the configuration structures read by the compiler,
//! the optimizer and the session.

mod settings;

pub use settings::{
    CompilerConfig, IdentifierQuoting, OptimizerSettings, QuarryConfig, QuarryConfigBuilder,
    SessionSettings,
};
