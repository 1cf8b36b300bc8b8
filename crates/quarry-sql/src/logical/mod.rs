//! Logical query plan representation.
//!
//! This module defines the immutable plan tree built by the DataFrame API.
//! Every node resolves and caches its output schema when it is constructed,
//! so errors surface at the builder call that introduced them.

mod builder;
mod catalog;
mod error;
mod expr;
mod operator;
mod plan;
pub mod resolver;
mod schema;

pub use builder::*;
pub use catalog::*;
pub use error::*;
pub use expr::*;
pub use operator::*;
pub use plan::*;
pub use schema::*;
