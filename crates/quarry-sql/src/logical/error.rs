//! Errors raised while building and resolving logical plans.

use quarry_common::ErrorCode;
use thiserror::Error;

/// Errors that can occur during plan building.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// No table with this name in the catalog.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A column reference matches no visible field.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A column reference matches more than one visible field.
    #[error("Ambiguous column: {name} (candidates: {candidates:?})")]
    ColumnAmbiguous {
        /// The reference as written.
        name: String,
        /// Qualified names of every matching field.
        candidates: Vec<String>,
    },

    /// Operand types are incompatible.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Aggregate misplaced, or an ungrouped column next to aggregates.
    #[error("Invalid aggregation: {0}")]
    InvalidAggregation(String),

    /// Function is not in the registry.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// An argument is out of range or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Plan shape is not valid.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

impl PlanError {
    /// Returns the stable error code for this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::TableNotFound(_) => ErrorCode::TableNotFound,
            Self::ColumnNotFound(_) => ErrorCode::ColumnNotFound,
            Self::ColumnAmbiguous { .. } => ErrorCode::ColumnAmbiguous,
            Self::TypeMismatch(_) => ErrorCode::TypeMismatch,
            Self::InvalidAggregation(_) => ErrorCode::InvalidAggregation,
            Self::UnknownFunction(_) => ErrorCode::UnknownFunction,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InvalidPlan(_) => ErrorCode::InvalidPlan,
        }
    }

    pub(crate) fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    pub(crate) fn invalid_aggregation(msg: impl Into<String>) -> Self {
        Self::InvalidAggregation(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for plan building.
pub type PlanResult<T> = Result<T, PlanError>;
