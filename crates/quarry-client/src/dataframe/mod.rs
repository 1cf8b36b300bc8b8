//! Lazy DataFrames.
//!
//! A [`DataFrame`] is an immutable logical plan bound to a [`Session`].
//! Transformations return new DataFrames that share the input plan; every
//! new node is resolved when it is built, so a bad column reference or a
//! type conflict fails at the call that introduced it. Nothing reaches the
//! database until a terminal action (`collect`, `count`, `first`).

mod grouped;

use quarry_sql::logical::{JoinType, LogicalPlan, LogicalPlanBuilder, SetOpType, SortExpr};
use quarry_sql::{Column, CompiledQuery, LogicalExpr, PlanError, SchemaRef};
use tracing::debug;

pub use grouped::GroupedData;

use crate::adapter::Row;
use crate::error::{ClientError, ClientResult};
use crate::session::{QueryResult, Session};

/// An immutable, lazily evaluated relation.
#[derive(Debug, Clone)]
pub struct DataFrame {
    session: Session,
    plan: LogicalPlan,
}

impl DataFrame {
    pub(crate) fn new(session: Session, plan: LogicalPlan) -> Self {
        Self { session, plan }
    }

    /// Returns the logical plan.
    pub fn plan(&self) -> &LogicalPlan {
        &self.plan
    }

    /// Returns the session this DataFrame runs in.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the output schema. The same `Arc` is returned every time.
    pub fn schema(&self) -> SchemaRef {
        self.plan.schema()
    }

    fn builder(&self) -> LogicalPlanBuilder {
        LogicalPlanBuilder::from(self.plan.clone())
    }

    fn derive(&self, builder: LogicalPlanBuilder) -> Self {
        Self::new(self.session.clone(), builder.build())
    }

    fn check_session(&self, other: &DataFrame) -> ClientResult<()> {
        if self.session.same_as(&other.session) {
            Ok(())
        } else {
            Err(ClientError::invalid_argument(
                "cannot combine DataFrames from different sessions",
            ))
        }
    }

    /// Returns a reference to the only output field matching `name`,
    /// carrying all of that field's qualifiers.
    pub fn col(&self, name: &str) -> ClientResult<LogicalExpr> {
        let index = self.resolve(name)?;
        Ok(self.all_field_refs().swap_remove(index))
    }

    fn resolve(&self, name: &str) -> ClientResult<usize> {
        let schema = self.schema();
        let reference = Column::from_qualified_name(name);
        match schema.matches(&reference).as_slice() {
            [index] => Ok(*index),
            [] => Err(PlanError::ColumnNotFound(name.to_string()).into()),
            many => Err(PlanError::ColumnAmbiguous {
                name: name.to_string(),
                candidates: many
                    .iter()
                    .filter_map(|&i| schema.field(i))
                    .map(|f| f.qualified_name())
                    .collect(),
            }
            .into()),
        }
    }

    fn all_field_refs(&self) -> Vec<LogicalExpr> {
        self.schema()
            .fields()
            .iter()
            .map(|f| LogicalExpr::Column(f.column.clone()))
            .collect()
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Projects `exprs`.
    ///
    /// A list made only of aggregate expressions becomes a global
    /// aggregate; mixing aggregate and plain expressions fails with
    /// `InvalidAggregation`.
    pub fn select(&self, exprs: Vec<LogicalExpr>) -> ClientResult<DataFrame> {
        if exprs.is_empty() {
            return Err(ClientError::invalid_argument("select requires at least one expression"));
        }
        let aggregates = exprs.iter().filter(|e| e.contains_aggregate()).count();
        let builder = if aggregates == 0 {
            self.builder().project(exprs)?
        } else if aggregates == exprs.len() {
            self.builder().aggregate(Vec::new(), exprs)?
        } else {
            return Err(PlanError::InvalidAggregation(
                "select mixes aggregate and non-aggregate expressions; use group_by".to_string(),
            )
            .into());
        };
        Ok(self.derive(builder))
    }

    /// Projects columns by name.
    pub fn select_columns(&self, names: &[&str]) -> ClientResult<DataFrame> {
        self.select(names.iter().map(|n| LogicalExpr::col(n)).collect())
    }

    /// Adds a column, or replaces every column already called `name` with
    /// one column at the first such position.
    pub fn with_column(&self, name: &str, expr: LogicalExpr) -> ClientResult<DataFrame> {
        let schema = self.schema();
        let mut exprs = Vec::with_capacity(schema.len() + 1);
        let mut new_column = Some(expr.alias(name));
        for (field, reference) in schema.fields().iter().zip(self.all_field_refs()) {
            if field.name() == name {
                if let Some(expr) = new_column.take() {
                    exprs.push(expr);
                }
            } else {
                exprs.push(reference);
            }
        }
        exprs.extend(new_column);
        Ok(self.derive(self.builder().project(exprs)?))
    }

    /// Renames the column matching `existing`.
    pub fn with_column_renamed(&self, existing: &str, new_name: &str) -> ClientResult<DataFrame> {
        let target = self.resolve(existing)?;
        let exprs = self
            .all_field_refs()
            .into_iter()
            .enumerate()
            .map(|(i, e)| if i == target { e.alias(new_name) } else { e })
            .collect();
        Ok(self.derive(self.builder().project(exprs)?))
    }

    /// Removes every column matching one of `names`.
    pub fn drop(&self, names: &[&str]) -> ClientResult<DataFrame> {
        let schema = self.schema();
        let mut dropped = vec![false; schema.len()];
        for name in names {
            let matches = schema.matches(&Column::from_qualified_name(name));
            if matches.is_empty() {
                return Err(PlanError::ColumnNotFound(name.to_string()).into());
            }
            for index in matches {
                dropped[index] = true;
            }
        }
        let exprs: Vec<_> = self
            .all_field_refs()
            .into_iter()
            .zip(dropped)
            .filter_map(|(e, gone)| (!gone).then_some(e))
            .collect();
        if exprs.is_empty() {
            return Err(ClientError::invalid_argument("cannot drop every column"));
        }
        Ok(self.derive(self.builder().project(exprs)?))
    }

    /// Names this DataFrame; its columns become `name.column`.
    pub fn alias(&self, name: &str) -> ClientResult<DataFrame> {
        Ok(self.derive(self.builder().alias(name)?))
    }

    // =========================================================================
    // Filtering and Ordering
    // =========================================================================

    /// Keeps rows for which `predicate` is true.
    pub fn filter(&self, predicate: LogicalExpr) -> ClientResult<DataFrame> {
        Ok(self.derive(self.builder().filter(predicate)?))
    }

    /// Same as [`filter`](Self::filter).
    pub fn where_(&self, predicate: LogicalExpr) -> ClientResult<DataFrame> {
        self.filter(predicate)
    }

    /// Orders rows by `keys`.
    pub fn sort(&self, keys: Vec<SortExpr>) -> ClientResult<DataFrame> {
        if keys.is_empty() {
            return Err(ClientError::invalid_argument("sort requires at least one key"));
        }
        Ok(self.derive(self.builder().sort(keys)?))
    }

    /// Same as [`sort`](Self::sort).
    pub fn order_by(&self, keys: Vec<SortExpr>) -> ClientResult<DataFrame> {
        self.sort(keys)
    }

    /// Keeps the first `n` rows.
    pub fn limit(&self, n: u64) -> ClientResult<DataFrame> {
        Ok(self.derive(self.builder().limit(0, Some(n))?))
    }

    /// Skips `offset` rows, then keeps `n`.
    pub fn limit_offset(&self, n: u64, offset: u64) -> ClientResult<DataFrame> {
        Ok(self.derive(self.builder().limit(offset, Some(n))?))
    }

    /// Removes duplicate rows.
    pub fn distinct(&self) -> ClientResult<DataFrame> {
        Ok(self.derive(self.builder().distinct()?))
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// Joins with `right` on a boolean condition. Columns of the result are
    /// qualified `left.` and `right.` by side.
    pub fn join(
        &self,
        right: &DataFrame,
        on: LogicalExpr,
        join_type: JoinType,
    ) -> ClientResult<DataFrame> {
        self.check_session(right)?;
        Ok(self.derive(self.builder().join(&right.plan, join_type, on)?))
    }

    /// Joins on equality of the named columns; each key appears once in
    /// the result.
    pub fn join_using(
        &self,
        right: &DataFrame,
        keys: &[&str],
        join_type: JoinType,
    ) -> ClientResult<DataFrame> {
        self.check_session(right)?;
        if keys.is_empty() {
            return Err(ClientError::invalid_argument("join_using requires at least one key"));
        }
        let keys = keys.iter().map(|k| k.to_string()).collect();
        Ok(self.derive(self.builder().join_using(&right.plan, join_type, keys)?))
    }

    /// Cartesian product with `right`.
    pub fn cross_join(&self, right: &DataFrame) -> ClientResult<DataFrame> {
        self.check_session(right)?;
        Ok(self.derive(self.builder().cross_join(&right.plan)?))
    }

    // =========================================================================
    // Aggregation
    // =========================================================================

    /// Groups rows by `keys`.
    pub fn group_by(&self, keys: Vec<LogicalExpr>) -> GroupedData {
        GroupedData::new(self.clone(), keys)
    }

    /// Aggregates over all rows.
    pub fn agg(&self, aggregates: Vec<LogicalExpr>) -> ClientResult<DataFrame> {
        self.group_by(Vec::new()).agg(aggregates)
    }

    // =========================================================================
    // Set Operations
    // =========================================================================

    fn set_operation(&self, other: &DataFrame, op: SetOpType) -> ClientResult<DataFrame> {
        self.check_session(other)?;
        Ok(self.derive(self.builder().set_operation(&other.plan, op)?))
    }

    /// Rows of either input, without duplicates.
    pub fn union(&self, other: &DataFrame) -> ClientResult<DataFrame> {
        self.set_operation(other, SetOpType::Union)
    }

    /// Rows of both inputs, keeping duplicates.
    pub fn union_all(&self, other: &DataFrame) -> ClientResult<DataFrame> {
        self.set_operation(other, SetOpType::UnionAll)
    }

    /// Rows present in both inputs.
    pub fn intersect(&self, other: &DataFrame) -> ClientResult<DataFrame> {
        self.set_operation(other, SetOpType::Intersect)
    }

    /// Rows present in both inputs, with multiplicity.
    pub fn intersect_all(&self, other: &DataFrame) -> ClientResult<DataFrame> {
        self.set_operation(other, SetOpType::IntersectAll)
    }

    /// Rows of this input absent from `other`.
    pub fn except(&self, other: &DataFrame) -> ClientResult<DataFrame> {
        self.set_operation(other, SetOpType::Except)
    }

    /// Rows of this input absent from `other`, with multiplicity.
    pub fn except_all(&self, other: &DataFrame) -> ClientResult<DataFrame> {
        self.set_operation(other, SetOpType::ExceptAll)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Compiles the plan for the session's dialect.
    pub fn compile(&self) -> ClientResult<CompiledQuery> {
        self.session.compile(&self.plan)
    }

    /// Returns the SQL text this DataFrame compiles to.
    pub fn to_sql(&self) -> ClientResult<String> {
        Ok(self.compile()?.sql)
    }

    /// Describes the logical plan, the optimized plan and the SQL text.
    pub fn explain(&self) -> ClientResult<String> {
        let optimized = self.session.optimize(&self.plan)?;
        let compiled = self.session.compiler().compile(&optimized)?;
        Ok(format!(
            "== Logical Plan ==\n{}\n== Optimized Plan ==\n{}\n== SQL ==\n{}\n",
            self.plan.explain().trim_end(),
            optimized.explain().trim_end(),
            compiled.sql
        ))
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Executes the plan and returns every row.
    pub fn collect(&self) -> ClientResult<QueryResult> {
        self.session.execute(&self.plan)
    }

    /// Executes `COUNT(*)` over the plan.
    pub fn count(&self) -> ClientResult<u64> {
        let plan = self
            .builder()
            .aggregate(Vec::new(), vec![LogicalExpr::count_star().alias("count")])?
            .build();
        let result = self.session.execute(&plan)?;
        let count = result
            .rows
            .first()
            .and_then(|row| row.get::<i64>(0))
            .ok_or_else(|| ClientError::execution("COUNT(*) returned no value"))?;
        u64::try_from(count)
            .map_err(|_| ClientError::execution(format!("COUNT(*) returned {count}")))
    }

    /// Executes the plan with a limit of one and returns that row.
    pub fn first(&self) -> ClientResult<Option<Row>> {
        let plan = self.builder().limit(0, Some(1))?.build();
        let rows = self.session.execute(&plan)?.into_rows();
        debug!(found = !rows.is_empty(), "first row fetched");
        Ok(rows.into_iter().next())
    }
}
