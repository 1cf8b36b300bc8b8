//! Sessions: the explicit context every DataFrame runs in.
//!
//! A [`Session`] bundles the configuration, the catalog used to resolve
//! table names, the compiler for the configured dialect, the optimizer and
//! the [`SessionAdapter`] that executes compiled statements. Sessions are
//! cheap to clone and safe to share between threads.

mod result;
mod validate;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use quarry_common::QuarryConfig;
use quarry_sql::logical::{Catalog, LogicalPlan, LogicalPlanBuilder, MemoryCatalog};
use quarry_sql::{CompiledQuery, LogicalExpr, Literal, Optimizer, OptimizerConfig, SchemaRef, SqlCompiler};
use tracing::{debug, info, warn};

pub use result::QueryResult;

use crate::adapter::{MockAdapter, Row, SessionAdapter, Value};
use crate::dataframe::DataFrame;
use crate::error::{ClientError, ClientResult};

/// Statistics about session usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Plans compiled, whether or not they were executed.
    pub plans_compiled: u64,
    /// Statements handed to the adapter.
    pub statements_executed: u64,
    /// Statements that failed in the adapter or in validation.
    pub statements_failed: u64,
    /// Rows read back from the adapter.
    pub rows_returned: u64,
    /// Total time spent executing statements.
    pub total_execution_time_ms: u64,
}

struct SessionInner {
    config: QuarryConfig,
    catalog: Arc<dyn Catalog>,
    adapter: Arc<dyn SessionAdapter>,
    compiler: SqlCompiler,
    optimizer: Optimizer,
    statement_counter: AtomicU64,
    stats: RwLock<SessionStats>,
}

/// Dialect, catalog, adapter and configuration for building and running
/// DataFrames.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Creates a session after validating `config`.
    pub fn new(
        config: QuarryConfig,
        catalog: Arc<dyn Catalog>,
        adapter: Arc<dyn SessionAdapter>,
    ) -> ClientResult<Self> {
        config.validate()?;
        let compiler = SqlCompiler::from_config(&config.compiler)?;
        let optimizer = Optimizer::new(OptimizerConfig::from(&config.optimizer));
        debug!(
            dialect = compiler.dialect().name(),
            adapter = adapter.name(),
            "session created"
        );
        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                catalog,
                adapter,
                compiler,
                optimizer,
                statement_counter: AtomicU64::new(0),
                stats: RwLock::new(SessionStats::default()),
            }),
        })
    }

    /// Starts a session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QuarryConfig {
        &self.inner.config
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.inner.catalog
    }

    /// Returns the adapter.
    pub fn adapter(&self) -> &Arc<dyn SessionAdapter> {
        &self.inner.adapter
    }

    /// Returns the compiler.
    pub fn compiler(&self) -> &SqlCompiler {
        &self.inner.compiler
    }

    /// Returns true if both handles refer to the same session.
    pub fn same_as(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SessionStats {
        self.inner.stats.read().clone()
    }

    // =========================================================================
    // DataFrame Sources
    // =========================================================================

    /// Returns a DataFrame over a catalog table.
    pub fn table(&self, name: &str) -> ClientResult<DataFrame> {
        let plan = LogicalPlanBuilder::scan(self.inner.catalog.as_ref(), name)?.build();
        Ok(DataFrame::new(self.clone(), plan))
    }

    /// Returns a DataFrame over inline literal rows.
    pub fn create_dataframe(
        &self,
        columns: &[&str],
        rows: Vec<Vec<Literal>>,
    ) -> ClientResult<DataFrame> {
        let names = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(LogicalExpr::Literal).collect())
            .collect();
        let plan = LogicalPlanBuilder::values(names, rows)?.build();
        Ok(DataFrame::new(self.clone(), plan))
    }

    /// Returns a DataFrame with `schema` and no rows.
    pub fn empty(&self, schema: SchemaRef) -> DataFrame {
        DataFrame::new(self.clone(), LogicalPlanBuilder::empty(schema).build())
    }

    /// Wraps an existing plan.
    pub fn dataframe(&self, plan: LogicalPlan) -> DataFrame {
        DataFrame::new(self.clone(), plan)
    }

    // =========================================================================
    // Compilation and Execution
    // =========================================================================

    /// Runs the optimizer over `plan`.
    pub fn optimize(&self, plan: &LogicalPlan) -> ClientResult<LogicalPlan> {
        Ok(self.inner.optimizer.optimize(plan.clone())?)
    }

    /// Optimizes and compiles `plan`.
    pub fn compile(&self, plan: &LogicalPlan) -> ClientResult<CompiledQuery> {
        let optimized = self.optimize(plan)?;
        let compiled = self.inner.compiler.compile(&optimized)?;
        self.inner.stats.write().plans_compiled += 1;
        Ok(compiled)
    }

    /// Compiles `plan`, executes it through the adapter and validates the
    /// returned rows.
    pub fn execute(&self, plan: &LogicalPlan) -> ClientResult<QueryResult> {
        let compiled = self.compile(plan)?;
        self.run(compiled)
    }

    fn run(&self, compiled: CompiledQuery) -> ClientResult<QueryResult> {
        let statement = self.inner.statement_counter.fetch_add(1, Ordering::Relaxed);
        if self.inner.config.session.log_statements {
            info!(statement, sql = %compiled.sql, params = compiled.params.len(), "executing statement");
        } else {
            debug!(statement, sql = %compiled.sql, params = compiled.params.len(), "executing statement");
        }

        let params: Vec<Value> = compiled.params.into_iter().map(Value::from).collect();
        let start = Instant::now();
        let result = self.read_rows(&compiled.sql, &params, &compiled.schema);
        let elapsed = start.elapsed();

        {
            let mut stats = self.inner.stats.write();
            stats.statements_executed += 1;
            stats.total_execution_time_ms += elapsed.as_millis() as u64;
            match &result {
                Ok(rows) => stats.rows_returned += rows.len() as u64,
                Err(_) => stats.statements_failed += 1,
            }
        }

        match result {
            Ok(rows) => {
                info!(
                    statement,
                    rows = rows.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "statement finished"
                );
                Ok(QueryResult {
                    schema: compiled.schema,
                    rows,
                    sql: compiled.sql,
                    execution_time: elapsed,
                })
            }
            Err(e) => {
                warn!(statement, code = %e.code(), error = %e, "statement failed");
                Err(e)
            }
        }
    }

    fn read_rows(&self, sql: &str, params: &[Value], schema: &SchemaRef) -> ClientResult<Vec<Row>> {
        let settings = &self.inner.config.session;
        let rows = self.inner.adapter.execute(sql, params)?;
        let limit = settings.max_rows.unwrap_or(usize::MAX);

        let mut out = Vec::new();
        for (index, row) in rows.take(limit).enumerate() {
            let row = row?;
            if settings.validate_results {
                validate::check_row(index, &row, schema)?;
            }
            out.push(row);
        }
        if out.len() == limit {
            debug!(max_rows = limit, "row limit reached");
        }
        Ok(out)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.inner.compiler.dialect().name())
            .field("adapter", &self.inner.adapter)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder for [`Session`]. Unset parts default to an empty
/// [`MemoryCatalog`], a [`MockAdapter`] and the default configuration.
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<QuarryConfig>,
    catalog: Option<Arc<dyn Catalog>>,
    adapter: Option<Arc<dyn SessionAdapter>>,
}

impl SessionBuilder {
    /// Creates a builder with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: QuarryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the catalog.
    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the adapter.
    pub fn adapter(mut self, adapter: Arc<dyn SessionAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Builds the session.
    pub fn build(self) -> ClientResult<Session> {
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(MemoryCatalog::new()) as Arc<dyn Catalog>);
        let adapter = self
            .adapter
            .unwrap_or_else(|| Arc::new(MockAdapter::new()) as Arc<dyn SessionAdapter>);
        Session::new(self.config.unwrap_or_default(), catalog, adapter)
    }
}

#[cfg(test)]
mod tests {
    use quarry_common::IdentifierQuoting;
    use quarry_sql::logical::TableMeta;
    use quarry_sql::{DataType, Field, Schema};

    use super::*;

    fn catalog() -> Arc<MemoryCatalog> {
        let catalog = MemoryCatalog::new();
        catalog.register(TableMeta::new(
            "users",
            Schema::new(vec![
                Field::not_null("id", DataType::BigInt),
                Field::nullable("name", DataType::Varchar(Some(64))),
            ]),
        ));
        Arc::new(catalog)
    }

    fn session(adapter: Arc<MockAdapter>) -> Session {
        Session::builder()
            .catalog(catalog())
            .adapter(adapter)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let session = Session::builder().build().unwrap();
        assert_eq!(session.compiler().dialect().name(), "ansi");
        assert!(matches!(
            session.table("users").unwrap_err(),
            ClientError::Plan(_)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = QuarryConfig::builder().dialect("oracle").build();
        let err = Session::builder().config(config).build().unwrap_err();
        assert_eq!(err.code(), quarry_common::ErrorCode::Config);
    }

    #[test]
    fn test_execute_records_statement_and_stats() {
        let adapter = Arc::new(MockAdapter::new().with_rows(vec![Row::new(vec![
            Value::Integer(1),
            Value::String("ada".into()),
        ])]));
        let session = session(adapter.clone());
        let df = session.table("users").unwrap();

        let result = session.execute(df.plan()).unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(
            adapter.last_statement().unwrap().sql,
            r#"SELECT "t0"."id", "t0"."name" FROM "users" AS "t0""#
        );

        let stats = session.stats();
        assert_eq!(stats.plans_compiled, 1);
        assert_eq!(stats.statements_executed, 1);
        assert_eq!(stats.rows_returned, 1);
        assert_eq!(stats.statements_failed, 0);
    }

    #[test]
    fn test_invalid_rows_fail_validation() {
        let adapter = Arc::new(MockAdapter::new().with_rows(vec![Row::new(vec![Value::Null])]));
        let session = session(adapter);
        let df = session.table("users").unwrap();

        let err = session.execute(df.plan()).unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch { row: 0, .. }));
        assert_eq!(session.stats().statements_failed, 1);
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let adapter = Arc::new(MockAdapter::new().with_rows(vec![Row::new(vec![Value::Null])]));
        let config = QuarryConfig::builder().validate_results(false).build();
        let session = Session::builder()
            .config(config)
            .catalog(catalog())
            .adapter(adapter)
            .build()
            .unwrap();
        let df = session.table("users").unwrap();
        assert_eq!(session.execute(df.plan()).unwrap().row_count(), 1);
    }

    #[test]
    fn test_max_rows() {
        let row = Row::new(vec![Value::Integer(1), Value::Null]);
        let adapter = Arc::new(MockAdapter::new().with_rows(vec![row; 5]));
        let config = QuarryConfig::builder().max_rows(2).build();
        let session = Session::builder()
            .config(config)
            .catalog(catalog())
            .adapter(adapter)
            .build()
            .unwrap();
        let df = session.table("users").unwrap();
        assert_eq!(session.execute(df.plan()).unwrap().row_count(), 2);
    }

    #[test]
    fn test_adapter_failure_propagates() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.fail_next("timeout");
        let session = session(adapter);
        let df = session.table("users").unwrap();

        let err = session.execute(df.plan()).unwrap_err();
        assert_eq!(err.code(), quarry_common::ErrorCode::Execution);
    }

    #[test]
    fn test_quoting_follows_config() {
        let adapter = Arc::new(MockAdapter::new());
        let config = QuarryConfig::builder()
            .dialect("postgres")
            .identifier_quoting(IdentifierQuoting::AsNeeded)
            .build();
        let session = Session::builder()
            .config(config)
            .catalog(catalog())
            .adapter(adapter)
            .build()
            .unwrap();
        let sql = session.compile(session.table("users").unwrap().plan()).unwrap().sql;
        assert_eq!(sql, "SELECT t0.id, t0.name FROM users AS t0");
    }
}
