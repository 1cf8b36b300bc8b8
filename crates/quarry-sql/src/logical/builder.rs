//! Logical plan builder.
//!
//! Each call validates its new node against the input schemas and wraps it
//! over the existing tree; inputs are shared, never modified. Errors surface
//! at the call that introduced them.

use std::sync::Arc;

use super::catalog::{Catalog, TableMeta};
use super::error::{PlanError, PlanResult};
use super::expr::{LogicalExpr, SortExpr};
use super::operator::*;
use super::plan::LogicalPlan;
use super::schema::SchemaRef;

/// Fluent constructor for [`LogicalPlan`]s.
#[derive(Debug, Clone)]
pub struct LogicalPlanBuilder {
    plan: LogicalPlan,
}

impl LogicalPlanBuilder {
    /// Starts from an existing plan.
    pub fn from(plan: LogicalPlan) -> Self {
        Self { plan }
    }

    /// Scans a table resolved through `catalog`.
    pub fn scan(catalog: &dyn Catalog, name: &str) -> PlanResult<Self> {
        let table = catalog
            .resolve_table(name)
            .ok_or_else(|| PlanError::TableNotFound(name.to_string()))?;
        Ok(Self::scan_table(table))
    }

    /// Scans a table from its metadata.
    pub fn scan_table(table: TableMeta) -> Self {
        Self::wrap(LogicalOperator::Scan(ScanOperator::new(table)))
    }

    /// Inline literal rows with the given column names.
    pub fn values(names: Vec<String>, rows: Vec<Vec<LogicalExpr>>) -> PlanResult<Self> {
        Ok(Self::wrap(LogicalOperator::Values(ValuesOperator::try_new(
            &names, rows,
        )?)))
    }

    /// A relation with `schema` and no rows.
    pub fn empty(schema: SchemaRef) -> Self {
        Self::wrap(LogicalOperator::EmptyRelation(EmptyRelationOperator::new(
            schema,
        )))
    }

    fn wrap(op: LogicalOperator) -> Self {
        Self {
            plan: LogicalPlan::new(op),
        }
    }

    fn input(&self) -> Arc<LogicalOperator> {
        self.plan.root.clone()
    }

    /// Output schema of the plan built so far.
    pub fn schema(&self) -> SchemaRef {
        self.plan.schema()
    }

    /// Projects `exprs`.
    pub fn project(&self, exprs: Vec<LogicalExpr>) -> PlanResult<Self> {
        let op = ProjectionOperator::try_new(self.input(), exprs)?;
        Ok(Self::wrap(LogicalOperator::Projection(op)))
    }

    /// Keeps rows satisfying `predicate`.
    pub fn filter(&self, predicate: LogicalExpr) -> PlanResult<Self> {
        let op = FilterOperator::try_new(self.input(), predicate)?;
        Ok(Self::wrap(LogicalOperator::Filter(op)))
    }

    /// Joins with `right` on a boolean condition.
    pub fn join(&self, right: &LogicalPlan, join_type: JoinType, on: LogicalExpr) -> PlanResult<Self> {
        self.join_with(right, join_type, JoinCondition::On(on))
    }

    /// Joins with `right` on equality of the named columns.
    pub fn join_using(
        &self,
        right: &LogicalPlan,
        join_type: JoinType,
        keys: Vec<String>,
    ) -> PlanResult<Self> {
        self.join_with(right, join_type, JoinCondition::Using(keys))
    }

    /// Cartesian product with `right`.
    pub fn cross_join(&self, right: &LogicalPlan) -> PlanResult<Self> {
        self.join_with(right, JoinType::Cross, JoinCondition::None)
    }

    fn join_with(
        &self,
        right: &LogicalPlan,
        join_type: JoinType,
        condition: JoinCondition,
    ) -> PlanResult<Self> {
        let op = JoinOperator::try_new(self.input(), right.root.clone(), join_type, condition)?;
        Ok(Self::wrap(LogicalOperator::Join(op)))
    }

    /// Groups by `group_by` and computes `aggregates` per group.
    pub fn aggregate(
        &self,
        group_by: Vec<LogicalExpr>,
        aggregates: Vec<LogicalExpr>,
    ) -> PlanResult<Self> {
        let op = AggregateOperator::try_new(self.input(), group_by, aggregates)?;
        Ok(Self::wrap(LogicalOperator::Aggregate(op)))
    }

    /// Orders rows by `order_by`.
    pub fn sort(&self, order_by: Vec<SortExpr>) -> PlanResult<Self> {
        let op = SortOperator::try_new(self.input(), order_by)?;
        Ok(Self::wrap(LogicalOperator::Sort(op)))
    }

    /// Skips `offset` rows and keeps at most `fetch`.
    pub fn limit(&self, offset: u64, fetch: Option<u64>) -> PlanResult<Self> {
        Ok(Self::wrap(LogicalOperator::Limit(LimitOperator::new(
            self.input(),
            offset,
            fetch,
        ))))
    }

    /// Removes duplicate rows.
    pub fn distinct(&self) -> PlanResult<Self> {
        Ok(Self::wrap(LogicalOperator::Distinct(DistinctOperator::new(
            self.input(),
        ))))
    }

    /// Combines with `right` by a set operation.
    pub fn set_operation(&self, right: &LogicalPlan, op: SetOpType) -> PlanResult<Self> {
        let op = SetOperationOperator::try_new(self.input(), right.root.clone(), op)?;
        Ok(Self::wrap(LogicalOperator::SetOperation(op)))
    }

    /// Names the plan as a derived table.
    pub fn alias(&self, alias: &str) -> PlanResult<Self> {
        let op = SubqueryAliasOperator::try_new(self.input(), alias)?;
        Ok(Self::wrap(LogicalOperator::SubqueryAlias(op)))
    }

    /// Returns the plan.
    pub fn build(self) -> LogicalPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::catalog::MemoryCatalog;
    use crate::logical::schema::{Field, Schema};
    use crate::types::DataType;

    fn test_catalog() -> MemoryCatalog {
        let catalog = MemoryCatalog::new();
        catalog.register(TableMeta::new(
            "users",
            Schema::new(vec![
                Field::not_null("id", DataType::Int),
                Field::nullable("name", DataType::Varchar(Some(255))),
                Field::nullable("age", DataType::Int),
            ]),
        ));
        catalog.register(TableMeta::new(
            "orders",
            Schema::new(vec![
                Field::not_null("id", DataType::Int),
                Field::not_null("user_id", DataType::Int),
                Field::nullable("amount", DataType::Decimal {
                    precision: Some(10),
                    scale: Some(2),
                }),
            ]),
        ));
        catalog
    }

    #[test]
    fn test_simple_select() {
        let catalog = test_catalog();
        let plan = LogicalPlanBuilder::scan(&catalog, "users")
            .unwrap()
            .project(vec![LogicalExpr::col("id"), LogicalExpr::col("name")])
            .unwrap()
            .build();
        assert_eq!(plan.schema().names(), vec!["id", "name"]);
        assert!(plan.display().contains("Scan: users"));
    }

    #[test]
    fn test_unknown_table() {
        let catalog = test_catalog();
        assert!(matches!(
            LogicalPlanBuilder::scan(&catalog, "missing"),
            Err(PlanError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_builder_never_mutates_input() {
        let catalog = test_catalog();
        let base = LogicalPlanBuilder::scan(&catalog, "users").unwrap();
        let before = base.schema();
        let filtered = base
            .filter(LogicalExpr::col("age").gt_eq(LogicalExpr::lit_i64(18)))
            .unwrap();
        assert!(Arc::ptr_eq(&before, &base.schema()));
        assert!(Arc::ptr_eq(&before, &filtered.schema()));
        assert_eq!(base.build().node_count(), 1);
    }

    #[test]
    fn test_join_ambiguity() {
        let catalog = test_catalog();
        let orders = LogicalPlanBuilder::scan(&catalog, "orders").unwrap().build();
        let joined = LogicalPlanBuilder::scan(&catalog, "users")
            .unwrap()
            .join(
                &orders,
                JoinType::Inner,
                LogicalExpr::col("users.id").eq(LogicalExpr::col("user_id")),
            )
            .unwrap();

        assert!(matches!(
            joined.project(vec![LogicalExpr::col("id")]),
            Err(PlanError::ColumnAmbiguous { .. })
        ));
        let plan = joined
            .project(vec![LogicalExpr::col("left.id"), LogicalExpr::col("right.id")])
            .unwrap()
            .build();
        assert_eq!(plan.schema().len(), 2);
    }

    #[test]
    fn test_aggregate() {
        let catalog = test_catalog();
        let plan = LogicalPlanBuilder::scan(&catalog, "orders")
            .unwrap()
            .aggregate(
                vec![LogicalExpr::col("user_id")],
                vec![LogicalExpr::call("sum", vec![LogicalExpr::col("amount")]).alias("total")],
            )
            .unwrap()
            .build();
        assert_eq!(plan.schema().names(), vec!["user_id", "total"]);
        assert!(matches!(
            plan.schema().field(1).unwrap().data_type,
            DataType::Decimal { .. }
        ));
    }

    #[test]
    fn test_order_by_limit() {
        let catalog = test_catalog();
        let plan = LogicalPlanBuilder::scan(&catalog, "users")
            .unwrap()
            .sort(vec![LogicalExpr::col("name").desc()])
            .unwrap()
            .limit(5, Some(10))
            .unwrap()
            .build();
        assert_eq!(plan.depth(), 3);
        assert!(plan.display().starts_with("Limit: offset=5 fetch=10"));
    }

    #[test]
    fn test_alias_and_set_operation() {
        let catalog = test_catalog();
        let ids = LogicalPlanBuilder::scan(&catalog, "users")
            .unwrap()
            .project(vec![LogicalExpr::col("id")])
            .unwrap();
        let aliased = ids.alias("u").unwrap();
        assert_eq!(aliased.schema().field(0).unwrap().qualified_name(), "u.id");

        let order_ids = LogicalPlanBuilder::scan(&catalog, "orders")
            .unwrap()
            .project(vec![LogicalExpr::col("user_id")])
            .unwrap()
            .build();
        let union = ids.set_operation(&order_ids, SetOpType::Union).unwrap();
        assert_eq!(union.schema().names(), vec!["id"]);

        let wide = LogicalPlanBuilder::scan(&catalog, "orders").unwrap().build();
        assert!(matches!(
            ids.set_operation(&wide, SetOpType::UnionAll),
            Err(PlanError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_values_and_empty() {
        let plan = LogicalPlanBuilder::values(
            vec!["n".to_string()],
            vec![vec![LogicalExpr::lit_i64(1)], vec![LogicalExpr::lit_i64(2)]],
        )
        .unwrap()
        .build();
        assert_eq!(plan.schema().field(0).unwrap().data_type, DataType::BigInt);

        let empty = LogicalPlanBuilder::empty(plan.schema()).build();
        assert!(Arc::ptr_eq(&empty.schema(), &plan.schema()));
    }
}
