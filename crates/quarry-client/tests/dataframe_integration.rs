//! End-to-end DataFrame tests.
//!
//! These tests drive the public API from table lookup through
//! optimization and compilation to execution against the mock adapter,
//! and parse the generated SQL back with `sqlparser`.

use std::sync::Arc;

use quarry_client::functions::{col, count_star, lit, row_number, sum};
use quarry_client::{
    ClientResult, DataFrame, JoinType, MockAdapter, Row, Session, Value, Window,
};
use quarry_common::{ErrorCode, IdentifierQuoting, QuarryConfig};
use quarry_sql::logical::{MemoryCatalog, TableMeta};
use quarry_sql::{Column, DataType, Field, Schema};
use sqlparser::ast::{BinaryOperator, Expr, SelectItem, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("quarry=debug")
        .try_init();
}

fn catalog() -> Arc<MemoryCatalog> {
    let catalog = MemoryCatalog::new();
    catalog.register(TableMeta::new(
        "users",
        Schema::new(vec![
            Field::not_null("id", DataType::BigInt),
            Field::nullable("name", DataType::Varchar(Some(64))),
            Field::nullable("age", DataType::Int),
            Field::nullable("email", DataType::Text),
        ]),
    ));
    catalog.register(TableMeta::new(
        "orders",
        Schema::new(vec![
            Field::not_null("id", DataType::BigInt),
            Field::not_null("user_id", DataType::BigInt),
            Field::nullable("amount", DataType::Double),
        ]),
    ));
    catalog.register(TableMeta::new(
        "t",
        Schema::new(vec![
            Field::not_null("a", DataType::BigInt),
            Field::not_null("b", DataType::BigInt),
            Field::not_null("c", DataType::BigInt),
        ]),
    ));
    Arc::new(catalog)
}

fn session_with(adapter: Arc<MockAdapter>) -> Session {
    init_tracing();
    let config = QuarryConfig::builder()
        .dialect("postgres")
        .identifier_quoting(IdentifierQuoting::AsNeeded)
        .build();
    Session::builder()
        .config(config)
        .catalog(catalog())
        .adapter(adapter)
        .build()
        .expect("session")
}

fn session() -> Session {
    session_with(Arc::new(MockAdapter::new()))
}

fn parse(sql: &str) -> Statement {
    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .unwrap_or_else(|e| panic!("failed to parse {sql}: {e}"));
    assert_eq!(statements.len(), 1);
    statements.remove(0)
}

fn first_projection(sql: &str) -> Expr {
    let Statement::Query(query) = parse(sql) else {
        panic!("not a query: {sql}");
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        panic!("not a select: {sql}");
    };
    match &select.projection[0] {
        SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => expr.clone(),
        other => panic!("unexpected projection {other:?}"),
    }
}

fn pipeline(session: &Session) -> ClientResult<DataFrame> {
    session
        .table("users")?
        .filter(col("age").gt(lit(18)))?
        .select(vec![col("id"), col("name").alias("n")])
}

#[test]
fn test_compilation_is_deterministic() {
    let session = session();
    let users = session.table("users").unwrap();
    let orders = session.table("orders").unwrap();
    let df = users
        .join(&orders, col("users.id").eq(col("orders.user_id")), JoinType::Left)
        .unwrap()
        .group_by(vec![col("left.name")])
        .agg(vec![sum(col("amount")).alias("total")])
        .unwrap()
        .sort(vec![col("total").desc()])
        .unwrap()
        .limit(5)
        .unwrap();

    let first = df.to_sql().unwrap();
    let second = df.to_sql().unwrap();
    assert_eq!(first, second);
    parse(&first);
}

#[test]
fn test_schema_is_stable() {
    let session = session();
    let df = pipeline(&session).unwrap();

    assert!(Arc::ptr_eq(&df.schema(), &df.schema()));
    let expected = Schema::new(vec![
        Field::new(Column::qualified("users", "id"), DataType::BigInt, false),
        Field::new(Column::new("n"), DataType::Varchar(Some(64)), true),
    ]);
    assert_eq!(*df.schema(), expected);

    let rebuilt = pipeline(&session).unwrap();
    assert_eq!(*rebuilt.schema(), expected);
}

#[test]
fn test_pruned_columns_never_reach_sql() {
    let session = session();
    let df = session
        .table("users")
        .unwrap()
        .with_column("next_age", col("age").add(lit(1)))
        .unwrap()
        .filter(col("next_age").gt(lit(21)))
        .unwrap()
        .select(vec![col("name")])
        .unwrap();

    let optimized = session.optimize(df.plan()).unwrap();
    assert_eq!(optimized.schema(), df.schema());

    let sql = df.to_sql().unwrap();
    assert!(!sql.contains("email"), "{sql}");
    assert!(!sql.contains(".id"), "{sql}");
    parse(&sql);
}

#[test]
fn test_parenthesization_round_trips() {
    let session = session();
    let t = session.table("t").unwrap();

    let grouped = t
        .select(vec![col("a").add(col("b")).mul(col("c")).alias("x")])
        .unwrap()
        .to_sql()
        .unwrap();
    let flat = t
        .select(vec![col("a").add(col("b").mul(col("c"))).alias("x")])
        .unwrap()
        .to_sql()
        .unwrap();
    assert_ne!(grouped, flat);
    assert!(grouped.starts_with("SELECT (t0.a + t0.b) * t0.c AS x"), "{grouped}");
    assert!(flat.starts_with("SELECT t0.a + t0.b * t0.c AS x"), "{flat}");

    match first_projection(&grouped) {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Multiply,
            ..
        } => assert!(matches!(*left, Expr::Nested(_))),
        other => panic!("unexpected shape {other:?}"),
    }
    match first_projection(&flat) {
        Expr::BinaryOp {
            op: BinaryOperator::Plus,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::BinaryOp {
                op: BinaryOperator::Multiply,
                ..
            }
        )),
        other => panic!("unexpected shape {other:?}"),
    }
}

#[test]
fn test_ambiguous_join_column() {
    let session = session();
    let users = session.table("users").unwrap();
    let orders = session.table("orders").unwrap();
    let joined = users
        .join(&orders, col("users.id").eq(col("orders.user_id")), JoinType::Inner)
        .unwrap();

    let err = joined.select(vec![col("id")]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ColumnAmbiguous);

    let sql = joined
        .select(vec![col("left.id"), col("amount")])
        .unwrap()
        .to_sql()
        .unwrap();
    assert!(sql.starts_with("SELECT t0.id, t1.amount FROM users AS t0"), "{sql}");
    parse(&sql);
}

#[test]
fn test_rename_round_trip() {
    let session = session();
    let df = session
        .table("t")
        .unwrap()
        .select(vec![col("a").alias("b")])
        .unwrap()
        .filter(col("b").gt(lit(1)))
        .unwrap();

    let sql = df.to_sql().unwrap();
    assert_eq!(sql, "SELECT t0.a AS b FROM t AS t0 WHERE t0.a > 1");
    parse(&sql);
}

#[test]
fn test_false_filter_compiles_to_empty_relation() {
    let adapter = Arc::new(MockAdapter::new());
    let session = session_with(adapter.clone());
    let df = session
        .table("users")
        .unwrap()
        .filter(lit(1).eq(lit(2)))
        .unwrap();

    let sql = df.to_sql().unwrap();
    assert!(sql.ends_with("WHERE 1 = 0"), "{sql}");
    parse(&sql);

    let result = df.collect().unwrap();
    assert!(!result.has_rows());
    assert_eq!(result.column_count(), 4);
    assert_eq!(adapter.statements().len(), 1);
}

#[test]
fn test_collect_validates_rows() {
    let adapter = Arc::new(MockAdapter::new());
    let session = session_with(adapter.clone());
    let df = session.table("orders").unwrap().select(vec![col("id"), col("amount")]).unwrap();

    adapter.push_response(vec![
        Row::new(vec![Value::Integer(1), Value::Float(9.5)]),
        Row::new(vec![Value::Integer(2), Value::Null]),
    ]);
    let result = df.collect().unwrap();
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.rows[0].get::<f64>(1), Some(9.5));

    adapter.push_response(vec![Row::new(vec![Value::Null, Value::Float(1.0)])]);
    let err = df.collect().unwrap_err();
    assert_eq!(err.code(), ErrorCode::SchemaMismatch);
}

#[test]
fn test_parameterized_literals() {
    let adapter = Arc::new(MockAdapter::new());
    let config = QuarryConfig::builder()
        .dialect("postgres")
        .identifier_quoting(IdentifierQuoting::AsNeeded)
        .parameterize_literals(true)
        .build();
    let session = Session::builder()
        .config(config)
        .catalog(catalog())
        .adapter(adapter.clone())
        .build()
        .unwrap();

    let df = session
        .table("users")
        .unwrap()
        .filter(col("age").gt(lit(18)).and(col("name").like(lit("a%"))))
        .unwrap()
        .select(vec![col("id")])
        .unwrap();
    df.collect().unwrap();

    let statement = adapter.last_statement().unwrap();
    assert_eq!(
        statement.sql,
        "SELECT t0.id FROM users AS t0 WHERE t0.age > $1 AND t0.name LIKE $2"
    );
    assert_eq!(
        statement.params,
        vec![Value::Integer(18), Value::String("a%".into())]
    );
}

#[test]
fn test_window_and_semi_join() {
    let session = session();
    let users = session.table("users").unwrap();
    let orders = session.table("orders").unwrap();

    let ranked = users
        .with_column(
            "rn",
            row_number().over(Window::order_by(vec![col("age").desc()])),
        )
        .unwrap()
        .filter(col("rn").lt_eq(lit(3)))
        .unwrap();
    let sql = ranked.to_sql().unwrap();
    assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY"), "{sql}");
    parse(&sql);

    let buyers = users
        .join(&orders, col("users.id").eq(col("orders.user_id")), JoinType::Semi)
        .unwrap();
    assert_eq!(buyers.schema().len(), 4);
    let sql = buyers.to_sql().unwrap();
    assert!(sql.contains("WHERE EXISTS (SELECT 1 FROM orders AS t1"), "{sql}");
    parse(&sql);
}

#[test]
fn test_values_and_union() {
    let session = session();
    let inline = session
        .create_dataframe(
            &["id", "name"],
            vec![
                vec![1i64.into(), "ada".into()],
                vec![2i64.into(), "grace".into()],
            ],
        )
        .unwrap();
    let users = session.table("users").unwrap().select_columns(&["id", "name"]).unwrap();

    let all = users.union_all(&inline).unwrap();
    assert_eq!(all.schema().names(), vec!["id", "name"]);
    let sql = all.to_sql().unwrap();
    assert!(sql.contains(") UNION ALL ("), "{sql}");
    parse(&sql);

    let counted = all.agg(vec![count_star().alias("n")]).unwrap();
    parse(&counted.to_sql().unwrap());
}
