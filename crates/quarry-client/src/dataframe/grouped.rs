//! Grouped DataFrames.

use quarry_sql::logical::LogicalPlanBuilder;
use quarry_sql::LogicalExpr;

use super::DataFrame;
use crate::error::{ClientError, ClientResult};

/// A DataFrame with grouping keys, waiting for its aggregates.
#[derive(Debug, Clone)]
pub struct GroupedData {
    input: DataFrame,
    keys: Vec<LogicalExpr>,
}

impl GroupedData {
    pub(super) fn new(input: DataFrame, keys: Vec<LogicalExpr>) -> Self {
        Self { input, keys }
    }

    /// Returns the grouping keys.
    pub fn keys(&self) -> &[LogicalExpr] {
        &self.keys
    }

    /// Computes `aggregates` per group. The result has the grouping keys
    /// first, then one column per aggregate.
    pub fn agg(&self, aggregates: Vec<LogicalExpr>) -> ClientResult<DataFrame> {
        if self.keys.is_empty() && aggregates.is_empty() {
            return Err(ClientError::invalid_argument(
                "aggregation needs a grouping key or an aggregate",
            ));
        }
        let builder = LogicalPlanBuilder::from(self.input.plan().clone())
            .aggregate(self.keys.clone(), aggregates)?;
        Ok(self.input.derive(builder))
    }

    /// Counts rows per group into a column named `count`.
    pub fn count(&self) -> ClientResult<DataFrame> {
        self.agg(vec![LogicalExpr::count_star().alias("count")])
    }
}
