//! Session adapters: the boundary between compiled SQL and a database.
//!
//! The core never talks to an engine itself. A [`SessionAdapter`] receives
//! the compiled text and its positional parameters and hands back rows;
//! the session validates those rows against the plan's resolved schema.

mod mock;
mod value;

use std::fmt;

pub use mock::{ExecutedStatement, MockAdapter};
pub use value::{FromValue, Value};

use crate::error::ClientResult;

/// One result row, values in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from its values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value at `index`.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Converts the value at `index`.
    pub fn get<T: FromValue>(&self, index: usize) -> Option<T> {
        self.value(index).and_then(T::from_value)
    }

    /// Returns all values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// Rows streamed back by an adapter. Each item may fail independently.
pub type RowIter = Box<dyn Iterator<Item = ClientResult<Row>> + Send>;

/// Executes compiled statements against a database.
///
/// Implementations are shared between sessions and threads. `execute` is
/// the only blocking call in the library; it is never retried or
/// cancelled by the caller.
pub trait SessionAdapter: Send + Sync + fmt::Debug {
    /// Runs `sql` with positional `params` and returns its rows.
    fn execute(&self, sql: &str, params: &[Value]) -> ClientResult<RowIter>;

    /// Short name used in log output.
    fn name(&self) -> &str {
        "adapter"
    }
}
