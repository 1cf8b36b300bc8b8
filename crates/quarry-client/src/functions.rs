//! Expression helpers for building DataFrame pipelines.
//!
//! Every helper builds an unvalidated [`LogicalExpr`]; names and arities
//! are checked against the function registry when the plan node carrying
//! the expression is built.
//!
//! ```rust
//! use quarry_client::functions::{col, lit, sum, when};
//!
//! let total = sum(col("amount")).alias("total");
//! let size = when(col("n").gt(lit(100)), lit("large"))
//!     .when(col("n").gt(lit(10)), lit("medium"))
//!     .otherwise(lit("small"));
//! # let _ = (total, size);
//! ```

use quarry_sql::{LogicalExpr, Literal};

/// A column reference; dots separate qualifiers (`left.id`).
pub fn col(name: &str) -> LogicalExpr {
    LogicalExpr::col(name)
}

/// A literal value.
pub fn lit(value: impl Into<Literal>) -> LogicalExpr {
    LogicalExpr::lit(value)
}

/// The NULL literal.
pub fn lit_null() -> LogicalExpr {
    LogicalExpr::lit_null()
}

fn call(name: &str, args: Vec<LogicalExpr>) -> LogicalExpr {
    LogicalExpr::call(name, args)
}

// ===== Aggregates =====

/// COUNT(*).
pub fn count_star() -> LogicalExpr {
    LogicalExpr::count_star()
}

/// COUNT(expr): non-null values.
pub fn count(expr: LogicalExpr) -> LogicalExpr {
    call("count", vec![expr])
}

/// COUNT(DISTINCT expr).
pub fn count_distinct(expr: LogicalExpr) -> LogicalExpr {
    count(expr).distinct()
}

/// SUM(expr).
pub fn sum(expr: LogicalExpr) -> LogicalExpr {
    call("sum", vec![expr])
}

/// AVG(expr).
pub fn avg(expr: LogicalExpr) -> LogicalExpr {
    call("avg", vec![expr])
}

/// MIN(expr).
pub fn min(expr: LogicalExpr) -> LogicalExpr {
    call("min", vec![expr])
}

/// MAX(expr).
pub fn max(expr: LogicalExpr) -> LogicalExpr {
    call("max", vec![expr])
}

/// Sample standard deviation.
pub fn stddev(expr: LogicalExpr) -> LogicalExpr {
    call("stddev", vec![expr])
}

/// String aggregation with a separator.
pub fn listagg(expr: LogicalExpr, separator: &str) -> LogicalExpr {
    call("listagg", vec![expr, lit(separator)])
}

// ===== Scalars =====

/// UPPER(expr).
pub fn upper(expr: LogicalExpr) -> LogicalExpr {
    call("upper", vec![expr])
}

/// LOWER(expr).
pub fn lower(expr: LogicalExpr) -> LogicalExpr {
    call("lower", vec![expr])
}

/// Character length.
pub fn length(expr: LogicalExpr) -> LogicalExpr {
    call("length", vec![expr])
}

/// SUBSTRING(expr, start, len); `start` is 1-based.
pub fn substring(expr: LogicalExpr, start: i64, len: Option<i64>) -> LogicalExpr {
    let mut args = vec![expr, lit(start)];
    if let Some(len) = len {
        args.push(lit(len));
    }
    call("substring", args)
}

/// TRIM(expr).
pub fn trim(expr: LogicalExpr) -> LogicalExpr {
    call("trim", vec![expr])
}

/// REPLACE(expr, from, to).
pub fn replace(expr: LogicalExpr, from: &str, to: &str) -> LogicalExpr {
    call("replace", vec![expr, lit(from), lit(to)])
}

/// CONCAT over any number of arguments.
pub fn concat(args: Vec<LogicalExpr>) -> LogicalExpr {
    call("concat", args)
}

/// First non-null argument.
pub fn coalesce(args: Vec<LogicalExpr>) -> LogicalExpr {
    call("coalesce", args)
}

/// `fallback` when `expr` is NULL.
pub fn ifnull(expr: LogicalExpr, fallback: LogicalExpr) -> LogicalExpr {
    call("ifnull", vec![expr, fallback])
}

/// NULL when both arguments are equal, otherwise `expr`.
pub fn nullif(expr: LogicalExpr, other: LogicalExpr) -> LogicalExpr {
    call("nullif", vec![expr, other])
}

/// ABS(expr).
pub fn abs(expr: LogicalExpr) -> LogicalExpr {
    call("abs", vec![expr])
}

/// ROUND(expr, digits).
pub fn round(expr: LogicalExpr, digits: i64) -> LogicalExpr {
    call("round", vec![expr, lit(digits)])
}

/// FLOOR(expr).
pub fn floor(expr: LogicalExpr) -> LogicalExpr {
    call("floor", vec![expr])
}

/// CEIL(expr).
pub fn ceil(expr: LogicalExpr) -> LogicalExpr {
    call("ceil", vec![expr])
}

/// The current date.
pub fn current_date() -> LogicalExpr {
    call("current_date", Vec::new())
}

/// The current timestamp.
pub fn current_timestamp() -> LogicalExpr {
    call("current_timestamp", Vec::new())
}

// ===== Window functions =====
//
// These need an OVER clause: `row_number().over(Window::order_by(..))`.

/// ROW_NUMBER().
pub fn row_number() -> LogicalExpr {
    call("row_number", Vec::new())
}

/// RANK().
pub fn rank() -> LogicalExpr {
    call("rank", Vec::new())
}

/// DENSE_RANK().
pub fn dense_rank() -> LogicalExpr {
    call("dense_rank", Vec::new())
}

/// PERCENT_RANK().
pub fn percent_rank() -> LogicalExpr {
    call("percent_rank", Vec::new())
}

/// CUME_DIST().
pub fn cume_dist() -> LogicalExpr {
    call("cume_dist", Vec::new())
}

/// NTILE(buckets).
pub fn ntile(buckets: i64) -> LogicalExpr {
    call("ntile", vec![lit(buckets)])
}

/// LAG(expr, offset).
pub fn lag(expr: LogicalExpr, offset: i64) -> LogicalExpr {
    call("lag", vec![expr, lit(offset)])
}

/// LEAD(expr, offset).
pub fn lead(expr: LogicalExpr, offset: i64) -> LogicalExpr {
    call("lead", vec![expr, lit(offset)])
}

/// FIRST_VALUE(expr).
pub fn first_value(expr: LogicalExpr) -> LogicalExpr {
    call("first_value", vec![expr])
}

/// LAST_VALUE(expr).
pub fn last_value(expr: LogicalExpr) -> LogicalExpr {
    call("last_value", vec![expr])
}

// ===== CASE =====

/// Starts a searched CASE expression.
pub fn when(condition: LogicalExpr, value: LogicalExpr) -> CaseBuilder {
    CaseBuilder {
        when_then: vec![(condition, value)],
    }
}

/// Searched CASE under construction; see [`when`].
#[derive(Debug, Clone)]
pub struct CaseBuilder {
    when_then: Vec<(LogicalExpr, LogicalExpr)>,
}

impl CaseBuilder {
    /// Adds a branch.
    pub fn when(mut self, condition: LogicalExpr, value: LogicalExpr) -> Self {
        self.when_then.push((condition, value));
        self
    }

    /// Finishes with an ELSE branch.
    pub fn otherwise(self, value: LogicalExpr) -> LogicalExpr {
        LogicalExpr::case(None, self.when_then, Some(value))
    }

    /// Finishes without ELSE; unmatched rows yield NULL.
    pub fn end(self) -> LogicalExpr {
        LogicalExpr::case(None, self.when_then, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_helpers() {
        assert!(sum(col("a")).is_aggregate_call());
        assert!(count_star().is_aggregate_call());
        assert!(!upper(col("a")).is_aggregate_call());

        match count_distinct(col("a")) {
            LogicalExpr::Function(f) => {
                assert_eq!(f.name, "count");
                assert!(f.distinct);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_case_builder() {
        let expr = when(col("n").gt(lit(1)), lit("big")).otherwise(lit("small"));
        match expr {
            LogicalExpr::Case {
                operand,
                when_then,
                else_result,
            } => {
                assert!(operand.is_none());
                assert_eq!(when_then.len(), 1);
                assert!(else_result.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            when(col("a").is_null(), lit(0)).end(),
            LogicalExpr::Case { else_result: None, .. }
        ));
    }

    #[test]
    fn test_substring_arity() {
        match substring(col("s"), 2, None) {
            LogicalExpr::Function(f) => assert_eq!(f.args.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
