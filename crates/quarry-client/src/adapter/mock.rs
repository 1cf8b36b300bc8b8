//! In-memory adapter that records statements and replays canned rows.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;

use super::{Row, RowIter, SessionAdapter, Value};
use crate::error::{ClientError, ClientResult};

/// A statement seen by [`MockAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    /// SQL text as received.
    pub sql: String,
    /// Bound parameters in placeholder order.
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
struct MockState {
    statements: Vec<ExecutedStatement>,
    responses: VecDeque<Vec<Row>>,
    default_rows: Vec<Row>,
    fail_next: Option<String>,
}

/// Adapter for tests: records every statement and answers with rows
/// queued by [`push_response`](Self::push_response), falling back to the
/// rows configured by [`with_rows`](Self::with_rows).
#[derive(Debug, Default)]
pub struct MockAdapter {
    state: Mutex<MockState>,
}

impl MockAdapter {
    /// Creates an adapter that answers every statement with no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rows returned when no queued response is pending.
    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        self.state.lock().default_rows = rows;
        self
    }

    /// Queues rows for the next statement.
    pub fn push_response(&self, rows: Vec<Row>) {
        self.state.lock().responses.push_back(rows);
    }

    /// Makes the next statement fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Returns every statement executed so far.
    pub fn statements(&self) -> Vec<ExecutedStatement> {
        self.state.lock().statements.clone()
    }

    /// Returns the most recent statement.
    pub fn last_statement(&self) -> Option<ExecutedStatement> {
        self.state.lock().statements.last().cloned()
    }

    /// Forgets recorded statements.
    pub fn clear(&self) {
        self.state.lock().statements.clear();
    }
}

impl SessionAdapter for MockAdapter {
    fn execute(&self, sql: &str, params: &[Value]) -> ClientResult<RowIter> {
        let mut state = self.state.lock();
        state.statements.push(ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        if let Some(message) = state.fail_next.take() {
            return Err(ClientError::execution(message));
        }

        let rows = match state.responses.pop_front() {
            Some(rows) => rows,
            None => state.default_rows.clone(),
        };
        debug!(rows = rows.len(), params = params.len(), "mock adapter answered");
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(iter: RowIter) -> Vec<Row> {
        iter.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_records_statements() {
        let adapter = MockAdapter::new();
        adapter.execute("SELECT 1", &[]).unwrap();
        adapter.execute("SELECT ?", &[Value::Integer(2)]).unwrap();

        let statements = adapter.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].params, vec![Value::Integer(2)]);
        assert_eq!(adapter.last_statement().unwrap().sql, "SELECT ?");

        adapter.clear();
        assert!(adapter.statements().is_empty());
    }

    #[test]
    fn test_queued_responses_then_default() {
        let adapter =
            MockAdapter::new().with_rows(vec![Row::new(vec![Value::Integer(0)])]);
        adapter.push_response(vec![
            Row::new(vec![Value::Integer(1)]),
            Row::new(vec![Value::Integer(2)]),
        ]);

        assert_eq!(collect(adapter.execute("q1", &[]).unwrap()).len(), 2);
        let rows = collect(adapter.execute("q2", &[]).unwrap());
        assert_eq!(rows, vec![Row::new(vec![Value::Integer(0)])]);
    }

    #[test]
    fn test_fail_next() {
        let adapter = MockAdapter::new();
        adapter.fail_next("connection reset");

        let err = adapter.execute("SELECT 1", &[]).err().unwrap();
        assert!(matches!(err, ClientError::Execution(ref m) if m == "connection reset"));
        assert!(adapter.execute("SELECT 1", &[]).is_ok());
        assert_eq!(adapter.statements().len(), 2);
    }
}
