//! SQL compiler for quarry.
//!
//! Translates an optimized [`LogicalPlan`] into a single SQL statement for
//! a target [`Dialect`]. Compilation is deterministic: the same plan,
//! dialect and configuration always produce byte-identical text, the same
//! schema and the same ordered parameter list.
//!
//! # Example
//!
//! ```ignore
//! use quarry_sql::compiler::SqlCompiler;
//!
//! let compiler = SqlCompiler::from_config(&config.compiler)?;
//! let compiled = compiler.compile(&plan)?;
//! println!("{} {:?}", compiled.sql, compiled.params);
//! ```

pub mod dialect;
mod expr;
mod params;
mod query;

pub use dialect::{
    default_dialect, dialect_for_name, AnsiDialect, Dialect, DialectFeatures, IdentifierCase,
    LimitStyle, MsSqlDialect, MySqlDialect, PlaceholderStyle, PostgresDialect, SnowflakeDialect,
};

use std::sync::Arc;

use quarry_common::{CompilerConfig, ErrorCode, PLAN_PATH_ROOT};
use thiserror::Error;
use tracing::debug;

use crate::logical::{LogicalPlan, PlanError, SchemaRef};
use crate::types::Literal;

use query::{Compilation, Naming};

/// Errors that can occur during compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The dialect cannot express a construct.
    #[error("{dialect} does not support {feature} (at {path})")]
    Unsupported {
        /// Plan node path.
        path: String,
        /// Dialect name.
        dialect: String,
        /// What was requested.
        feature: String,
    },

    /// A reference could not be bound while emitting.
    #[error("{source} (at {path})")]
    Plan {
        /// Plan node path.
        path: String,
        /// Underlying plan error.
        source: PlanError,
    },

    /// Two output fields share a fully qualified name.
    #[error("Duplicate column {name} (at {path})")]
    DuplicateColumn {
        /// Plan node path.
        path: String,
        /// The repeated qualified name.
        name: String,
    },

    /// An internal invariant was violated.
    #[error("Internal compiler error: {message} (at {path})")]
    Internal {
        /// Plan node path.
        path: String,
        /// Description.
        message: String,
    },

    /// Bad compiler input, such as an unknown dialect name.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CompileError {
    pub(crate) fn unsupported(dialect: &str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            path: String::new(),
            dialect: dialect.to_string(),
            feature: feature.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            path: String::new(),
            message: message.into(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unsupported { .. } => ErrorCode::UnsupportedDialectFeature,
            Self::Plan { source, .. } => source.code(),
            Self::DuplicateColumn { .. } => ErrorCode::ColumnAmbiguous,
            Self::Internal { .. } => ErrorCode::CompilationInternalError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }

    /// Path of the plan node that failed (`root/0/1`), if known.
    pub fn path(&self) -> Option<&str> {
        let path = match self {
            Self::Unsupported { path, .. }
            | Self::Plan { path, .. }
            | Self::DuplicateColumn { path, .. }
            | Self::Internal { path, .. } => path,
            Self::InvalidArgument(_) => return None,
        };
        (!path.is_empty()).then_some(path.as_str())
    }

    /// Sets the node path unless a deeper node already set it.
    pub(crate) fn at(mut self, node: &str) -> Self {
        match &mut self {
            Self::Unsupported { path, .. }
            | Self::Plan { path, .. }
            | Self::DuplicateColumn { path, .. }
            | Self::Internal { path, .. } => {
                if path.is_empty() {
                    *path = node.to_string();
                }
            }
            Self::InvalidArgument(_) => {}
        }
        self
    }
}

impl From<PlanError> for CompileError {
    fn from(source: PlanError) -> Self {
        Self::Plan {
            path: String::new(),
            source,
        }
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Statement text.
    pub sql: String,
    /// Result schema, equal to the plan's root schema.
    pub schema: SchemaRef,
    /// Bind values in placeholder order; empty unless literals are
    /// parameterized.
    pub params: Vec<Literal>,
}

/// Compiles logical plans for one dialect and configuration.
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    dialect: Arc<dyn Dialect>,
    config: CompilerConfig,
}

impl SqlCompiler {
    /// Creates a compiler for `dialect`; `config.dialect` is ignored.
    pub fn new(dialect: Arc<dyn Dialect>, config: CompilerConfig) -> Self {
        Self { dialect, config }
    }

    /// Creates a compiler for the dialect named in `config`.
    pub fn from_config(config: &CompilerConfig) -> CompileResult<Self> {
        Ok(Self::new(dialect_for_name(&config.dialect)?, config.clone()))
    }

    /// Returns the target dialect.
    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles `plan` into one statement.
    pub fn compile(&self, plan: &LogicalPlan) -> CompileResult<CompiledQuery> {
        let schema = plan.schema();
        let mut compilation = Compilation::new(self.dialect.as_ref(), &self.config);
        let block = compilation.operator(&plan.root, PLAN_PATH_ROOT)?;
        let text = compilation
            .render(block, Naming::Final(&schema))
            .map_err(|e| e.at(PLAN_PATH_ROOT))?;

        let (sql, params) = if self.config.parameterize_literals {
            compilation
                .params
                .finish(&text, self.dialect.placeholder_style())?
        } else {
            (text, Vec::new())
        };

        debug!(
            dialect = self.dialect.name(),
            nodes = plan.node_count(),
            params = params.len(),
            "compiled plan"
        );
        Ok(CompiledQuery {
            sql,
            schema,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::{
        Field, JoinType, LogicalExpr, LogicalPlanBuilder, Schema, SetOpType, TableMeta,
        WindowSpec,
    };
    use crate::types::DataType;
    use sqlparser::ast::{BinaryOperator, Expr, SelectItem, SetExpr, Statement};
    use sqlparser::dialect::{GenericDialect, PostgreSqlDialect};
    use sqlparser::parser::Parser;

    fn users() -> LogicalPlanBuilder {
        LogicalPlanBuilder::scan_table(TableMeta::new(
            "users",
            Schema::new(vec![
                Field::not_null("id", DataType::Int),
                Field::nullable("name", DataType::Varchar(Some(255))),
                Field::nullable("age", DataType::Int),
            ]),
        ))
    }

    fn orders() -> LogicalPlanBuilder {
        LogicalPlanBuilder::scan_table(TableMeta::new(
            "orders",
            Schema::new(vec![
                Field::not_null("id", DataType::Int),
                Field::not_null("user_id", DataType::Int),
                Field::nullable("amount", DataType::Double),
            ]),
        ))
    }

    fn accounts() -> LogicalPlanBuilder {
        LogicalPlanBuilder::scan_table(TableMeta::new(
            "accounts",
            Schema::new(vec![
                Field::not_null("id", DataType::Int),
                Field::nullable("balance", DataType::Double),
            ]),
        ))
    }

    fn compiler(dialect: &str) -> SqlCompiler {
        SqlCompiler::from_config(&CompilerConfig {
            dialect: dialect.to_string(),
            ..CompilerConfig::default()
        })
        .unwrap()
    }

    fn compile(plan: LogicalPlanBuilder) -> String {
        compiler("ansi").compile(&plan.build()).unwrap().sql
    }

    fn parse(sql: &str) -> Statement {
        let mut statements = Parser::parse_sql(&GenericDialect {}, sql).unwrap();
        assert_eq!(statements.len(), 1);
        statements.remove(0)
    }

    fn projection(sql: &str) -> Vec<Expr> {
        let Statement::Query(query) = parse(sql) else {
            panic!("not a query: {sql}")
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            panic!("not a select: {sql}")
        };
        select
            .projection
            .iter()
            .map(|item| match item {
                SelectItem::UnnamedExpr(expr) => expr.clone(),
                SelectItem::ExprWithAlias { expr, .. } => expr.clone(),
                other => panic!("unexpected select item {other}"),
            })
            .collect()
    }

    fn join_condition() -> LogicalExpr {
        LogicalExpr::qualified_col("left", "id").eq(LogicalExpr::qualified_col("right", "user_id"))
    }

    #[test]
    fn test_compile_scan() {
        assert_eq!(
            compile(users()),
            r#"SELECT "t0"."id", "t0"."name", "t0"."age" FROM "users" AS "t0""#
        );
    }

    #[test]
    fn test_filter_and_projection_fold() {
        let plan = users()
            .filter(LogicalExpr::col("age").gt(LogicalExpr::lit_i64(18)))
            .unwrap()
            .project(vec![LogicalExpr::col("name")])
            .unwrap();
        assert_eq!(
            compile(plan),
            r#"SELECT "t0"."name" FROM "users" AS "t0" WHERE "t0"."age" > 18"#
        );
    }

    #[test]
    fn test_parenthesization() {
        let plan = users()
            .project(vec![
                LogicalExpr::col("id")
                    .add(LogicalExpr::col("age"))
                    .mul(LogicalExpr::col("age"))
                    .alias("x"),
                LogicalExpr::col("id")
                    .add(LogicalExpr::col("age").mul(LogicalExpr::col("age")))
                    .alias("y"),
            ])
            .unwrap();
        let sql = compile(plan);
        assert!(sql.contains(r#"("t0"."id" + "t0"."age") * "t0"."age" AS "x""#));
        assert!(sql.contains(r#""t0"."id" + "t0"."age" * "t0"."age" AS "y""#));

        let exprs = projection(&sql);
        assert!(matches!(
            &exprs[0],
            Expr::BinaryOp { left, op: BinaryOperator::Multiply, .. }
                if matches!(**left, Expr::Nested(_))
        ));
        assert!(matches!(
            &exprs[1],
            Expr::BinaryOp { op: BinaryOperator::Plus, right, .. }
                if matches!(**right, Expr::BinaryOp { op: BinaryOperator::Multiply, .. })
        ));
    }

    #[test]
    fn test_boolean_precedence() {
        let a = LogicalExpr::col("age").gt(LogicalExpr::lit_i64(1));
        let b = LogicalExpr::col("id").eq(LogicalExpr::lit_i64(2));
        let c = LogicalExpr::col("name").is_null();
        let plan = users().filter(a.or(b).and(c)).unwrap();
        let sql = compile(plan);
        assert!(sql.ends_with(
            r#"WHERE ("t0"."age" > 1 OR "t0"."id" = 2) AND "t0"."name" IS NULL"#
        ));
        parse(&sql);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let plan = users()
            .join(&orders().build(), JoinType::Inner, join_condition())
            .unwrap()
            .aggregate(
                vec![LogicalExpr::qualified_col("left", "name")],
                vec![LogicalExpr::call("sum", vec![LogicalExpr::col("amount")]).alias("total")],
            )
            .unwrap()
            .build();
        let compiler = compiler("postgres");
        let first = compiler.compile(&plan).unwrap();
        let second = compiler.compile(&plan).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rename_round_trip() {
        let plan = users()
            .project(vec![LogicalExpr::col("name").alias("b")])
            .unwrap()
            .project(vec![LogicalExpr::col("b")])
            .unwrap();
        assert_eq!(
            compile(plan),
            r#"SELECT "t0"."name" AS "b" FROM "users" AS "t0""#
        );
    }

    #[test]
    fn test_empty_relation() {
        let schema = users().schema();
        let compiled = compiler("ansi")
            .compile(&LogicalPlanBuilder::empty(schema.clone()).build())
            .unwrap();
        assert!(compiled.sql.starts_with("SELECT CAST(NULL AS INT) AS \"id\""));
        assert!(compiled.sql.ends_with(" WHERE 1 = 0"));
        assert_eq!(compiled.schema, schema);
        parse(&compiled.sql);

        let mysql = compiler("mysql")
            .compile(&LogicalPlanBuilder::empty(schema).build())
            .unwrap();
        assert!(mysql.sql.ends_with(" FROM DUAL WHERE 1 = 0"));
    }

    #[test]
    fn test_inner_join() {
        let plan = users()
            .join(&orders().build(), JoinType::Inner, join_condition())
            .unwrap()
            .project(vec![
                LogicalExpr::qualified_col("left", "name"),
                LogicalExpr::col("amount"),
            ])
            .unwrap();
        assert_eq!(
            compile(plan),
            concat!(
                r#"SELECT "t0"."name", "t1"."amount" FROM "users" AS "t0" "#,
                r#"INNER JOIN "orders" AS "t1" ON "t0"."id" = "t1"."user_id""#
            )
        );
    }

    #[test]
    fn test_join_using_and_full_join() {
        let plan = users()
            .join_using(&accounts().build(), JoinType::Inner, vec!["id".into()])
            .unwrap();
        assert_eq!(
            compile(plan),
            concat!(
                r#"SELECT "t0"."id", "t0"."name", "t0"."age", "t1"."balance" "#,
                r#"FROM "users" AS "t0" INNER JOIN "accounts" AS "t1" ON "t0"."id" = "t1"."id""#
            )
        );

        let full = users()
            .join_using(&accounts().build(), JoinType::Full, vec!["id".into()])
            .unwrap()
            .build();
        let sql = compiler("ansi").compile(&full).unwrap().sql;
        assert!(sql.starts_with(r#"SELECT COALESCE("t0"."id", "t1"."id") AS "id""#));
        assert!(sql.contains("FULL OUTER JOIN"));
    }

    #[test]
    fn test_join_side_filters() {
        let right = orders()
            .filter(LogicalExpr::col("amount").gt(LogicalExpr::lit_i64(10)))
            .unwrap()
            .build();

        // An inner join hoists the filter into WHERE.
        let inner = users()
            .join(&right, JoinType::Inner, join_condition())
            .unwrap();
        let sql = compile(inner);
        assert!(sql.contains(r#"INNER JOIN "orders" AS "t1""#));
        assert!(sql.ends_with(r#"WHERE "t1"."amount" > 10"#));

        // The nullable side of an outer join keeps its filter in a derived table.
        let left = users().join(&right, JoinType::Left, join_condition()).unwrap();
        let sql = compile(left);
        assert!(sql.contains(r#"LEFT JOIN (SELECT "t1"."id" AS "c0""#));
        assert!(sql.contains(r#"WHERE "t1"."amount" > 10) AS "t2""#));
        assert!(!sql.ends_with("> 10"));
        parse(&sql);
    }

    #[test]
    fn test_semi_and_anti_join() {
        let semi = users()
            .join(&orders().build(), JoinType::Semi, join_condition())
            .unwrap();
        assert_eq!(
            compile(semi),
            concat!(
                r#"SELECT "t0"."id", "t0"."name", "t0"."age" FROM "users" AS "t0" "#,
                r#"WHERE EXISTS (SELECT 1 FROM "orders" AS "t1" WHERE "t0"."id" = "t1"."user_id")"#
            )
        );

        let anti = users()
            .join(&orders().build(), JoinType::Anti, join_condition())
            .unwrap();
        let sql = compile(anti);
        assert!(sql.contains("WHERE NOT EXISTS (SELECT 1"));
        parse(&sql);
    }

    #[test]
    fn test_aggregate_and_having() {
        let plan = orders()
            .aggregate(
                vec![LogicalExpr::col("user_id")],
                vec![LogicalExpr::call("sum", vec![LogicalExpr::col("amount")]).alias("total")],
            )
            .unwrap()
            .filter(LogicalExpr::col("total").gt(LogicalExpr::lit_i64(100)))
            .unwrap();
        assert_eq!(
            compile(plan),
            concat!(
                r#"SELECT "t0"."user_id", SUM("t0"."amount") AS "total" FROM "orders" AS "t0" "#,
                r#"GROUP BY "t0"."user_id" HAVING SUM("t0"."amount") > 100"#
            )
        );
    }

    #[test]
    fn test_projection_feeding_aggregate_is_derived() {
        let plan = users()
            .project(vec![
                LogicalExpr::col("age").add(LogicalExpr::lit_i64(1)).alias("next"),
            ])
            .unwrap()
            .aggregate(vec![LogicalExpr::col("next")], vec![LogicalExpr::count_star().alias("n")])
            .unwrap();
        let sql = compile(plan);
        assert!(sql.starts_with(r#"SELECT "t1"."c0" AS "next", COUNT(*) AS "n" FROM (SELECT"#));
        assert!(sql.ends_with(r#"GROUP BY "t1"."c0""#));
        parse(&sql);
    }

    #[test]
    fn test_sort_and_limit_styles() {
        let plan = users()
            .sort(vec![LogicalExpr::col("age").desc()])
            .unwrap()
            .limit(0, Some(10))
            .unwrap()
            .build();

        let ansi = compiler("ansi").compile(&plan).unwrap().sql;
        assert!(ansi.ends_with(r#"ORDER BY "t0"."age" DESC FETCH FIRST 10 ROWS ONLY"#));

        let postgres = compiler("postgres").compile(&plan).unwrap().sql;
        assert!(postgres.ends_with(r#"ORDER BY "t0"."age" DESC LIMIT 10"#));
        Parser::parse_sql(&PostgreSqlDialect {}, &postgres).unwrap();

        let mssql = compiler("mssql").compile(&plan).unwrap().sql;
        assert!(mssql.starts_with("SELECT TOP 10 [t0].[id]"));

        let paged = users().limit(20, Some(10)).unwrap().build();
        let mssql = compiler("mssql").compile(&paged).unwrap().sql;
        assert!(mssql.ends_with("ORDER BY (SELECT NULL) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"));

        let offset_only = users().limit(5, None).unwrap().build();
        let mysql = compiler("mysql").compile(&offset_only).unwrap().sql;
        assert!(mysql.ends_with("LIMIT 18446744073709551615 OFFSET 5"));
    }

    #[test]
    fn test_filter_after_limit_uses_derived_table() {
        let plan = users()
            .limit(0, Some(5))
            .unwrap()
            .filter(LogicalExpr::col("age").gt(LogicalExpr::lit_i64(1)))
            .unwrap();
        assert_eq!(
            compile(plan),
            concat!(
                r#"SELECT "t1"."c0" AS "id", "t1"."c1" AS "name", "t1"."c2" AS "age" FROM "#,
                r#"(SELECT "t0"."id" AS "c0", "t0"."name" AS "c1", "t0"."age" AS "c2" "#,
                r#"FROM "users" AS "t0" FETCH FIRST 5 ROWS ONLY) AS "t1" WHERE "t1"."c2" > 1"#
            )
        );
    }

    #[test]
    fn test_distinct_and_set_operations() {
        let ids = users().project(vec![LogicalExpr::col("id")]).unwrap().build();
        let union = users()
            .project(vec![LogicalExpr::col("id")])
            .unwrap()
            .set_operation(&ids, SetOpType::Union)
            .unwrap();
        assert_eq!(
            compile(union),
            concat!(
                r#"(SELECT "t0"."id" FROM "users" AS "t0") UNION "#,
                r#"(SELECT "t1"."id" AS "c0" FROM "users" AS "t1")"#
            )
        );

        let distinct = users()
            .project(vec![LogicalExpr::col("name")])
            .unwrap()
            .distinct()
            .unwrap();
        assert_eq!(
            compile(distinct),
            r#"SELECT DISTINCT "t0"."name" FROM "users" AS "t0""#
        );

        let intersect_all = ids_plan_op(SetOpType::IntersectAll);
        let err = compiler("mssql").compile(&intersect_all).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedDialectFeature);
        assert!(compiler("postgres").compile(&intersect_all).is_ok());
    }

    fn ids_plan_op(op: SetOpType) -> LogicalPlan {
        let ids = users().project(vec![LogicalExpr::col("id")]).unwrap().build();
        users()
            .project(vec![LogicalExpr::col("id")])
            .unwrap()
            .set_operation(&ids, op)
            .unwrap()
            .build()
    }

    #[test]
    fn test_window_function_then_filter() {
        let window = WindowSpec::new()
            .partition_by(vec![LogicalExpr::col("age")])
            .order_by(vec![LogicalExpr::col("id").desc()]);
        let plan = users()
            .project(vec![
                LogicalExpr::col("name"),
                LogicalExpr::call("row_number", vec![]).over(window).alias("rn"),
            ])
            .unwrap()
            .filter(LogicalExpr::col("rn").eq(LogicalExpr::lit_i64(1)))
            .unwrap();
        let sql = compile(plan);
        assert!(sql.contains(
            r#"ROW_NUMBER() OVER (PARTITION BY "t0"."age" ORDER BY "t0"."id" DESC) AS "c1""#
        ));
        assert!(sql.ends_with(r#"WHERE "t1"."c1" = 1"#));
        parse(&sql);
    }

    #[test]
    fn test_values_relation() {
        let plan = LogicalPlanBuilder::values(
            vec!["a".into(), "b".into()],
            vec![
                vec![LogicalExpr::lit_i64(1), LogicalExpr::lit_str("x")],
                vec![LogicalExpr::lit_i64(2), LogicalExpr::lit_null()],
            ],
        )
        .unwrap();
        let sql = compile(plan);
        assert!(sql.starts_with(r#"SELECT "t0"."c0" AS "a", "t0"."c1" AS "b" FROM (SELECT 1 AS "c0""#));
        assert!(sql.contains(" UNION ALL SELECT 2 AS \"c0\", CAST(NULL AS "));
        parse(&sql);
    }

    #[test]
    fn test_parameterized_literals() {
        let config = CompilerConfig {
            dialect: "postgres".into(),
            parameterize_literals: true,
            ..CompilerConfig::default()
        };
        let plan = users()
            .filter(
                LogicalExpr::col("age")
                    .gt(LogicalExpr::lit_i64(18))
                    .and(LogicalExpr::col("name").eq(LogicalExpr::lit_str("x"))),
            )
            .unwrap()
            .build();
        let compiled = SqlCompiler::from_config(&config).unwrap().compile(&plan).unwrap();
        assert!(compiled.sql.ends_with(r#"WHERE "t0"."age" > $1 AND "t0"."name" = $2"#));
        assert_eq!(
            compiled.params,
            vec![Literal::Integer(18), Literal::String("x".into())]
        );
    }

    fn parameterized_compiler() -> SqlCompiler {
        SqlCompiler::from_config(&CompilerConfig {
            dialect: "postgres".into(),
            parameterize_literals: true,
            ..CompilerConfig::default()
        })
        .unwrap()
    }

    fn parameterized(plan: LogicalPlanBuilder) -> CompiledQuery {
        let compiled = parameterized_compiler().compile(&plan.build()).unwrap();
        Parser::parse_sql(&PostgreSqlDialect {}, &compiled.sql)
            .unwrap_or_else(|e| panic!("failed to parse {}: {e}", compiled.sql));
        compiled
    }

    #[test]
    fn test_parameterized_group_keys_stay_inline() {
        let plan = users()
            .aggregate(
                vec![LogicalExpr::col("age").add(LogicalExpr::lit_i64(1))],
                vec![LogicalExpr::count_star().alias("n")],
            )
            .unwrap()
            .filter(LogicalExpr::col("n").gt(LogicalExpr::lit_i64(5)))
            .unwrap();
        let compiled = parameterized(plan);
        assert!(compiled.sql.starts_with(r#"SELECT "t0"."age" + 1 AS "#), "{}", compiled.sql);
        assert!(
            compiled
                .sql
                .ends_with(r#"GROUP BY "t0"."age" + 1 HAVING COUNT(*) > $1"#),
            "{}",
            compiled.sql
        );
        assert_eq!(compiled.params, vec![Literal::Integer(5)]);
    }

    #[test]
    fn test_parameterized_window_output() {
        let window = WindowSpec::new()
            .order_by(vec![LogicalExpr::col("age").add(LogicalExpr::lit_i64(1)).desc()]);
        let plan = users()
            .project(vec![
                LogicalExpr::col("name"),
                LogicalExpr::call("row_number", vec![]).over(window).alias("rn"),
                LogicalExpr::col("age").mul(LogicalExpr::lit_i64(2)).alias("doubled"),
            ])
            .unwrap()
            .filter(LogicalExpr::col("rn").lt_eq(LogicalExpr::lit_i64(3)))
            .unwrap();
        let compiled = parameterized(plan);
        assert!(compiled.sql.contains(r#"ORDER BY "t0"."age" + $1 DESC"#), "{}", compiled.sql);
        assert!(compiled.sql.ends_with(" <= $3"), "{}", compiled.sql);
        assert_eq!(
            compiled.params,
            vec![Literal::Integer(1), Literal::Integer(2), Literal::Integer(3)]
        );
    }

    #[test]
    fn test_parameterized_derived_table() {
        let plan = users()
            .filter(LogicalExpr::col("age").gt(LogicalExpr::lit_i64(18)))
            .unwrap()
            .limit(0, Some(10))
            .unwrap()
            .filter(LogicalExpr::col("age").lt(LogicalExpr::lit_i64(65)))
            .unwrap();
        let compiled = parameterized(plan);
        assert!(compiled.sql.contains(r#""t0"."age" > $1 LIMIT 10"#), "{}", compiled.sql);
        assert!(compiled.sql.ends_with(" < $2"), "{}", compiled.sql);
        assert_eq!(
            compiled.params,
            vec![Literal::Integer(18), Literal::Integer(65)]
        );
    }

    #[test]
    fn test_parameterized_set_operation() {
        let tagged = |plan: LogicalPlanBuilder, tag: &str| {
            plan.project(vec![
                LogicalExpr::col("id"),
                LogicalExpr::lit_str(tag).alias("src"),
            ])
            .unwrap()
        };
        let right = tagged(orders(), "orders").build();
        let plan = tagged(users(), "users")
            .set_operation(&right, SetOpType::UnionAll)
            .unwrap();
        let compiled = parameterized(plan);
        assert!(compiled.sql.contains(") UNION ALL ("), "{}", compiled.sql);
        assert!(compiled.sql.contains("$2"), "{}", compiled.sql);
        assert_eq!(
            compiled.params,
            vec![
                Literal::String("users".into()),
                Literal::String("orders".into())
            ]
        );
    }

    #[test]
    fn test_nul_in_identifier_rejected() {
        let plan = LogicalPlanBuilder::scan_table(TableMeta::new(
            "events",
            Schema::new(vec![Field::nullable("a\u{0}P0\u{0}", DataType::Int)]),
        ))
        .filter(LogicalExpr::col("a\u{0}P0\u{0}").gt(LogicalExpr::lit_i64(1)))
        .unwrap();
        let err = parameterized_compiler().compile(&plan.build()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let tagged = users()
            .project(vec![LogicalExpr::lit_str("x\u{0}").alias("tag")])
            .unwrap()
            .build();
        let err = compiler("ansi").compile(&tagged).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_identifier_quoting_as_needed() {
        let config = CompilerConfig {
            dialect: "postgres".into(),
            identifier_quoting: quarry_common::IdentifierQuoting::AsNeeded,
            ..CompilerConfig::default()
        };
        let plan = users().project(vec![LogicalExpr::col("name").alias("User")]).unwrap().build();
        let sql = SqlCompiler::from_config(&config).unwrap().compile(&plan).unwrap().sql;
        assert_eq!(sql, r#"SELECT t0.name AS "User" FROM users AS t0"#);
    }

    #[test]
    fn test_unsupported_features_report_path() {
        let plan = users()
            .join(&orders().build(), JoinType::Full, join_condition())
            .unwrap()
            .project(vec![LogicalExpr::col("amount")])
            .unwrap()
            .build();
        let err = compiler("mysql").compile(&plan).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedDialectFeature);
        assert_eq!(err.path(), Some("root/0"));

        let sorted = users()
            .sort(vec![LogicalExpr::col("age").asc().nulls_first()])
            .unwrap()
            .build();
        let err = compiler("mysql").compile(&sorted).unwrap_err();
        assert_eq!(err.path(), Some("root"));
        assert!(compiler("postgres").compile(&sorted).is_ok());
    }

    #[test]
    fn test_unknown_dialect() {
        let err = SqlCompiler::from_config(&CompilerConfig {
            dialect: "oracle".into(),
            ..CompilerConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.path(), None);
    }
}
