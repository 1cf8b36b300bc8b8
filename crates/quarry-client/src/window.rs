//! Window specification shorthands.

use quarry_sql::logical::{SortExpr, WindowFrameBound, WindowSpec};
use quarry_sql::LogicalExpr;

/// Entry points for building a [`WindowSpec`].
///
/// ```rust
/// use quarry_client::functions::{col, row_number};
/// use quarry_client::Window;
///
/// let spec = Window::partition_by(vec![col("dept")])
///     .order_by(vec![col("salary").desc()])
///     .rows_between(Window::unbounded_preceding(), Window::current_row());
/// let ranked = row_number().over(spec).alias("rn");
/// # let _ = ranked;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Window;

impl Window {
    /// An empty window: `OVER ()`.
    pub fn spec() -> WindowSpec {
        WindowSpec::new()
    }

    /// A window partitioned by `exprs`.
    pub fn partition_by(exprs: Vec<LogicalExpr>) -> WindowSpec {
        WindowSpec::new().partition_by(exprs)
    }

    /// A window ordered by `keys`.
    pub fn order_by(keys: Vec<SortExpr>) -> WindowSpec {
        WindowSpec::new().order_by(keys)
    }

    /// `UNBOUNDED PRECEDING`.
    pub fn unbounded_preceding() -> WindowFrameBound {
        WindowFrameBound::UnboundedPreceding
    }

    /// `n PRECEDING`.
    pub fn preceding(n: u64) -> WindowFrameBound {
        WindowFrameBound::Preceding(n)
    }

    /// `CURRENT ROW`.
    pub fn current_row() -> WindowFrameBound {
        WindowFrameBound::CurrentRow
    }

    /// `n FOLLOWING`.
    pub fn following(n: u64) -> WindowFrameBound {
        WindowFrameBound::Following(n)
    }

    /// `UNBOUNDED FOLLOWING`.
    pub fn unbounded_following() -> WindowFrameBound {
        WindowFrameBound::UnboundedFollowing
    }
}
