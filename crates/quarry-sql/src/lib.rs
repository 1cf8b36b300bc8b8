//! # quarry-sql
//!
//! Lazy relational plans and their translation to SQL text.
//!
//! This crate implements:
//! - Scalar expressions and the function registry
//! - Schema resolution for every plan node at construction time
//! - Immutable logical plans and a builder over them
//! - A rule-based plan optimizer
//! - A dialect-aware SQL compiler with parameterized literals

#![warn(missing_docs)]
#![warn(clippy::all)]

/// SQL data types and literal values
pub mod types;

/// Built-in function registry
pub mod functions;

/// Logical plan representation
pub mod logical;

/// Query optimizer
pub mod optimizer;

/// SQL text generation
pub mod compiler;

pub use compiler::{CompileError, CompileResult, CompiledQuery, Dialect, SqlCompiler};
pub use logical::{
    Catalog, Column, Field, LogicalExpr, LogicalPlan, LogicalPlanBuilder, MemoryCatalog,
    PlanError, PlanResult, Schema, SchemaRef, TableMeta,
};
pub use optimizer::{Optimizer, OptimizerConfig, OptimizerError, OptimizerResult};
pub use types::{DataType, Literal};
