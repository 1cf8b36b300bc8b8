//! Stable error kinds.

use std::fmt;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Invalid argument provided.
    InvalidArgument = 0x0001,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,

    // Configuration errors (0x0200 - 0x02FF)
    /// Configuration could not be parsed or is invalid.
    Config = 0x0200,

    // Planning errors (0x0300 - 0x03FF)
    /// Table not found in the catalog.
    TableNotFound = 0x0300,
    /// Column reference matches no visible field.
    ColumnNotFound = 0x0301,
    /// Column reference matches more than one visible field.
    ColumnAmbiguous = 0x0302,
    /// Operand or result types are incompatible.
    TypeMismatch = 0x0303,
    /// Aggregate used where it is not allowed, or a non-grouped column
    /// referenced next to aggregates.
    InvalidAggregation = 0x0304,
    /// Function is not in the registry.
    UnknownFunction = 0x0305,
    /// Plan shape is not valid.
    InvalidPlan = 0x0306,

    // Optimizer errors (0x0400 - 0x04FF)
    /// An optimizer rule failed.
    Optimizer = 0x0400,

    // Compilation errors (0x0500 - 0x05FF)
    /// The target dialect cannot express a construct.
    UnsupportedDialectFeature = 0x0500,
    /// The compiler hit a violated internal invariant.
    CompilationInternalError = 0x0501,

    // Execution errors (0x0600 - 0x06FF)
    /// The session adapter failed to execute a statement.
    Execution = 0x0600,
    /// Returned rows do not match the resolved schema.
    SchemaMismatch = 0x0601,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Config",
            0x03 => "Planning",
            0x04 => "Optimizer",
            0x05 => "Compilation",
            0x06 => "Execution",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
