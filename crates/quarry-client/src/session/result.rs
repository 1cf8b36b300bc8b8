//! Materialized query results.

use std::time::Duration;

use quarry_sql::SchemaRef;

use crate::adapter::{Row, Value};

/// Rows returned by a terminal DataFrame action, with the schema they were
/// validated against.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Resolved output schema of the executed plan.
    pub schema: SchemaRef,
    /// Row data.
    pub rows: Vec<Row>,
    /// The SQL text that produced the rows.
    pub sql: String,
    /// Time spent in the adapter, including row reads.
    pub execution_time: Duration,
}

impl QueryResult {
    /// Returns true if the result has rows.
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    /// Returns the output column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.names()
    }

    /// Gets a single value from the first row.
    pub fn get_value(&self, column: usize) -> Option<&Value> {
        self.rows.first().and_then(|row| row.value(column))
    }

    /// Iterates over rows.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Consumes the result, returning its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quarry_sql::{DataType, Field, Schema};

    use super::*;

    #[test]
    fn test_query_result() {
        let schema = Arc::new(Schema::new(vec![
            Field::not_null("id", DataType::BigInt),
            Field::nullable("name", DataType::Text),
        ]));
        let result = QueryResult {
            schema,
            rows: vec![
                Row::new(vec![Value::Integer(1), Value::String("Alice".to_string())]),
                Row::new(vec![Value::Integer(2), Value::String("Bob".to_string())]),
            ],
            sql: "SELECT id, name FROM users".to_string(),
            execution_time: Duration::from_millis(10),
        };

        assert!(result.has_rows());
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.column_count(), 2);
        assert_eq!(result.column_names(), vec!["id", "name"]);
        assert_eq!(result.get_value(0), Some(&Value::Integer(1)));
    }
}
