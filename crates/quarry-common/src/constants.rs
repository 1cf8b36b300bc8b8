//! Workspace-wide constants for quarry.

// =============================================================================
// Dialects
// =============================================================================

/// Dialect used when the configuration does not name one.
pub const DEFAULT_DIALECT: &str = "ansi";

/// Dialect names accepted by `compiler.dialect` (compared case-insensitively).
pub const SUPPORTED_DIALECTS: &[&str] = &["ansi", "snowflake", "postgres", "mysql", "mssql"];

// =============================================================================
// Naming
// =============================================================================

/// Prefix of generated derived-table aliases (`t0`, `t1`, ...).
pub const DEFAULT_ALIAS_PREFIX: &str = "t";

/// Prefix of collision-free column names exposed by derived tables.
pub const INTERNAL_COLUMN_PREFIX: &str = "c";

/// Qualifier added to every field exposed by the left side of a join.
pub const LEFT_QUALIFIER: &str = "left";

/// Qualifier added to every field exposed by the right side of a join.
pub const RIGHT_QUALIFIER: &str = "right";

/// First segment of every plan node path reported in errors (`root/0/1`).
pub const PLAN_PATH_ROOT: &str = "root";

// =============================================================================
// Compilation
// =============================================================================

/// Predicate emitted for relations known to produce no rows.
pub const EMPTY_RELATION_PREDICATE: &str = "1 = 0";

/// Indentation width of `LogicalPlan::display` and `explain` output.
pub const EXPLAIN_INDENT: usize = 2;
