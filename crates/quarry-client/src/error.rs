//! Error types for the client library.

use quarry_common::{ConfigError, ErrorCode};
use quarry_sql::{CompileError, OptimizerError, PlanError};
use thiserror::Error;

/// Client error type.
///
/// Wraps the planning, optimization, compilation and configuration errors
/// of the lower layers, and adds the failures that only show up once a
/// statement reaches a session adapter.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Building or resolving a plan node failed.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// An optimizer rule failed.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// SQL generation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The session adapter reported a failure.
    #[error("execution failed: {0}")]
    Execution(String),

    /// A returned row does not fit the resolved schema.
    #[error("row {row} does not match the result schema: {message}")]
    SchemaMismatch {
        /// Zero-based row number.
        row: usize,
        /// What is wrong with the row.
        message: String,
    },

    /// An argument to a DataFrame operation is unacceptable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClientError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Plan(e) => e.code(),
            Self::Optimizer(e) => e.code(),
            Self::Compile(e) => e.code(),
            Self::Config(e) => e.code(),
            Self::Execution(_) => ErrorCode::Execution,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }

    pub(crate) fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_codes() {
        let err: ClientError = PlanError::ColumnNotFound("x".into()).into();
        assert_eq!(err.code(), ErrorCode::ColumnNotFound);
        assert_eq!(err.to_string(), "Column not found: x");

        let err: ClientError = CompileError::Internal {
            path: "root/1".into(),
            message: "boom".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::CompilationInternalError);
    }

    #[test]
    fn test_execution_codes() {
        assert_eq!(ClientError::execution("down").code(), ErrorCode::Execution);
        let err = ClientError::SchemaMismatch {
            row: 3,
            message: "expected 2 values, got 1".into(),
        };
        assert_eq!(err.code(), ErrorCode::SchemaMismatch);
        assert!(err.to_string().starts_with("row 3"));
    }
}
