//! Logical operators for query plans.
//!
//! These represent the abstract operations in a query plan tree. Every
//! operator computes its output schema once, in its constructor.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalog::TableMeta;
use super::error::{PlanError, PlanResult};
use super::expr::{BinaryOp, LogicalExpr, SortExpr};
use super::resolver;
use super::schema::{Schema, SchemaRef};

/// Join type for join operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// Rows matching on both sides.
    Inner,
    /// Every left row, NULL-padded on the right.
    Left,
    /// Every right row, NULL-padded on the left.
    Right,
    /// Every row of both sides.
    Full,
    /// Cartesian product.
    Cross,
    /// Semi join - returns rows from left that have a match in right.
    Semi,
    /// Anti join - returns rows from left that have no match in right.
    Anti,
}

impl JoinType {
    /// Returns true if this is an outer join.
    pub fn is_outer(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Right | JoinType::Full)
    }

    /// Returns true for joins that only filter the left side.
    pub fn is_semi_or_anti(&self) -> bool {
        matches!(self, JoinType::Semi | JoinType::Anti)
    }

    /// Whether the (left, right) side fields become nullable.
    pub fn nullable_sides(&self) -> (bool, bool) {
        match self {
            JoinType::Left => (false, true),
            JoinType::Right => (true, false),
            JoinType::Full => (true, true),
            _ => (false, false),
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
            JoinType::Full => write!(f, "FULL"),
            JoinType::Cross => write!(f, "CROSS"),
            JoinType::Semi => write!(f, "SEMI"),
            JoinType::Anti => write!(f, "ANTI"),
        }
    }
}

/// How the two sides of a join are matched.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// Arbitrary boolean predicate over both sides.
    On(LogicalExpr),
    /// Equality on same-named columns; each key is output once.
    Using(Vec<String>),
    /// No condition (cross join only).
    None,
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinCondition::On(expr) => write!(f, "ON {}", expr),
            JoinCondition::Using(keys) => write!(f, "USING ({})", keys.join(", ")),
            JoinCondition::None => Ok(()),
        }
    }
}

/// Origin of one join output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinColumn {
    /// Field `i` of the left input.
    Left(usize),
    /// Field `j` of the right input.
    Right(usize),
    /// `COALESCE(left[i], right[j])` (full join `USING` key).
    Coalesce(usize, usize),
}

/// Set operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOpType {
    /// Distinct rows of either side.
    Union,
    /// All rows of both sides.
    UnionAll,
    /// Distinct rows present on both sides.
    Intersect,
    /// Rows present on both sides, with multiplicity.
    IntersectAll,
    /// Distinct left rows absent on the right.
    Except,
    /// Left rows absent on the right, with multiplicity.
    ExceptAll,
}

impl SetOpType {
    /// Returns true for the `ALL` (bag) variants.
    pub fn is_all(&self) -> bool {
        matches!(
            self,
            SetOpType::UnionAll | SetOpType::IntersectAll | SetOpType::ExceptAll
        )
    }
}

impl fmt::Display for SetOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOpType::Union => write!(f, "UNION"),
            SetOpType::UnionAll => write!(f, "UNION ALL"),
            SetOpType::Intersect => write!(f, "INTERSECT"),
            SetOpType::IntersectAll => write!(f, "INTERSECT ALL"),
            SetOpType::Except => write!(f, "EXCEPT"),
            SetOpType::ExceptAll => write!(f, "EXCEPT ALL"),
        }
    }
}

/// A logical operator in a query plan.
#[derive(Debug, Clone)]
pub enum LogicalOperator {
    /// Table scan.
    Scan(ScanOperator),

    /// Projection (SELECT clause).
    Projection(ProjectionOperator),

    /// Filter (WHERE clause).
    Filter(FilterOperator),

    /// Join.
    Join(JoinOperator),

    /// Aggregate (GROUP BY).
    Aggregate(AggregateOperator),

    /// Sort (ORDER BY).
    Sort(SortOperator),

    /// Limit (LIMIT/OFFSET).
    Limit(LimitOperator),

    /// Distinct (SELECT DISTINCT).
    Distinct(DistinctOperator),

    /// Set operation (UNION, INTERSECT, EXCEPT).
    SetOperation(SetOperationOperator),

    /// Subquery alias.
    SubqueryAlias(SubqueryAliasOperator),

    /// Inline literal rows.
    Values(ValuesOperator),

    /// Relation that yields no rows.
    EmptyRelation(EmptyRelationOperator),
}

impl LogicalOperator {
    /// Returns the output schema of this operator.
    pub fn schema(&self) -> SchemaRef {
        match self {
            LogicalOperator::Scan(op) => op.projected_schema.clone(),
            LogicalOperator::Projection(op) => op.schema.clone(),
            LogicalOperator::Filter(op) => op.input.schema(),
            LogicalOperator::Join(op) => op.schema.clone(),
            LogicalOperator::Aggregate(op) => op.schema.clone(),
            LogicalOperator::Sort(op) => op.input.schema(),
            LogicalOperator::Limit(op) => op.input.schema(),
            LogicalOperator::Distinct(op) => op.input.schema(),
            LogicalOperator::SetOperation(op) => op.schema.clone(),
            LogicalOperator::SubqueryAlias(op) => op.schema.clone(),
            LogicalOperator::Values(op) => op.schema.clone(),
            LogicalOperator::EmptyRelation(op) => op.schema.clone(),
        }
    }

    /// Returns the child operators.
    pub fn children(&self) -> Vec<&Arc<LogicalOperator>> {
        match self {
            LogicalOperator::Scan(_)
            | LogicalOperator::Values(_)
            | LogicalOperator::EmptyRelation(_) => vec![],
            LogicalOperator::Projection(op) => vec![&op.input],
            LogicalOperator::Filter(op) => vec![&op.input],
            LogicalOperator::Join(op) => vec![&op.left, &op.right],
            LogicalOperator::Aggregate(op) => vec![&op.input],
            LogicalOperator::Sort(op) => vec![&op.input],
            LogicalOperator::Limit(op) => vec![&op.input],
            LogicalOperator::Distinct(op) => vec![&op.input],
            LogicalOperator::SetOperation(op) => vec![&op.left, &op.right],
            LogicalOperator::SubqueryAlias(op) => vec![&op.input],
        }
    }

    /// Returns true if this is a leaf operator.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            LogicalOperator::Scan(_)
                | LogicalOperator::Values(_)
                | LogicalOperator::EmptyRelation(_)
        )
    }

    /// Returns the operator name.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOperator::Scan(_) => "Scan",
            LogicalOperator::Projection(_) => "Projection",
            LogicalOperator::Filter(_) => "Filter",
            LogicalOperator::Join(_) => "Join",
            LogicalOperator::Aggregate(_) => "Aggregate",
            LogicalOperator::Sort(_) => "Sort",
            LogicalOperator::Limit(_) => "Limit",
            LogicalOperator::Distinct(_) => "Distinct",
            LogicalOperator::SetOperation(_) => "SetOp",
            LogicalOperator::SubqueryAlias(_) => "SubqueryAlias",
            LogicalOperator::Values(_) => "Values",
            LogicalOperator::EmptyRelation(_) => "EmptyRelation",
        }
    }

    /// Rebuilds this operator over new inputs, re-running validation.
    ///
    /// `inputs` must have one entry per child, in [`children`] order.
    ///
    /// [`children`]: LogicalOperator::children
    pub fn with_new_inputs(&self, inputs: Vec<Arc<LogicalOperator>>) -> PlanResult<Self> {
        let expected = self.children().len();
        if inputs.len() != expected {
            return Err(PlanError::InvalidPlan(format!(
                "{} expects {} input(s), got {}",
                self.name(),
                expected,
                inputs.len()
            )));
        }
        let mut inputs = inputs.into_iter();
        let mut next = || {
            inputs
                .next()
                .ok_or_else(|| PlanError::InvalidPlan("missing operator input".to_string()))
        };

        Ok(match self {
            LogicalOperator::Scan(_)
            | LogicalOperator::Values(_)
            | LogicalOperator::EmptyRelation(_) => self.clone(),
            LogicalOperator::Projection(op) => LogicalOperator::Projection(
                ProjectionOperator::try_new(next()?, op.exprs.clone())?,
            ),
            LogicalOperator::Filter(op) => {
                LogicalOperator::Filter(FilterOperator::try_new(next()?, op.predicate.clone())?)
            }
            LogicalOperator::Join(op) => {
                let left = next()?;
                let right = next()?;
                LogicalOperator::Join(JoinOperator::try_new(
                    left,
                    right,
                    op.join_type,
                    op.condition.clone(),
                )?)
            }
            LogicalOperator::Aggregate(op) => LogicalOperator::Aggregate(
                AggregateOperator::try_new(next()?, op.group_by.clone(), op.aggregates.clone())?,
            ),
            LogicalOperator::Sort(op) => {
                LogicalOperator::Sort(SortOperator::try_new(next()?, op.order_by.clone())?)
            }
            LogicalOperator::Limit(op) => {
                LogicalOperator::Limit(LimitOperator::new(next()?, op.offset, op.fetch))
            }
            LogicalOperator::Distinct(_) => {
                LogicalOperator::Distinct(DistinctOperator::new(next()?))
            }
            LogicalOperator::SetOperation(op) => {
                let left = next()?;
                let right = next()?;
                LogicalOperator::SetOperation(SetOperationOperator::try_new(left, right, op.op)?)
            }
            LogicalOperator::SubqueryAlias(op) => LogicalOperator::SubqueryAlias(
                SubqueryAliasOperator::try_new(next()?, op.alias.clone())?,
            ),
        })
    }
}

/// Table scan operator.
#[derive(Debug, Clone)]
pub struct ScanOperator {
    /// Table metadata.
    pub table: TableMeta,
    /// Table schema, qualified by the table's short name.
    pub table_schema: SchemaRef,
    /// Projected columns (None = all).
    pub projection: Option<Vec<usize>>,
    /// Schema after projection.
    pub projected_schema: SchemaRef,
}

impl ScanOperator {
    /// Creates a new scan operator.
    pub fn new(table: TableMeta) -> Self {
        let schema = Arc::new(resolver::scan_schema(&table));
        Self {
            table,
            table_schema: schema.clone(),
            projection: None,
            projected_schema: schema,
        }
    }

    /// Narrows the scan to `indices` of its current output.
    pub fn with_projection(&self, indices: &[usize]) -> PlanResult<Self> {
        if indices.is_empty() {
            return Err(PlanError::InvalidPlan(
                "scan projection cannot be empty".to_string(),
            ));
        }
        let mut absolute = Vec::with_capacity(indices.len());
        for &i in indices {
            let index = match &self.projection {
                Some(current) => current.get(i).copied(),
                None => (i < self.table_schema.len()).then_some(i),
            };
            absolute.push(index.ok_or_else(|| {
                PlanError::InvalidPlan(format!(
                    "scan projection index {} out of range for {}",
                    i, self.table.name
                ))
            })?);
        }
        Ok(Self {
            table: self.table.clone(),
            table_schema: self.table_schema.clone(),
            projected_schema: Arc::new(self.table_schema.project(&absolute)),
            projection: Some(absolute),
        })
    }
}

/// Projection operator.
#[derive(Debug, Clone)]
pub struct ProjectionOperator {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Projection expressions.
    pub exprs: Vec<LogicalExpr>,
    /// Output schema.
    pub schema: SchemaRef,
}

impl ProjectionOperator {
    /// Creates a projection, resolving every expression against the input.
    pub fn try_new(input: Arc<LogicalOperator>, exprs: Vec<LogicalExpr>) -> PlanResult<Self> {
        let schema = Arc::new(resolver::projection_schema(&input.schema(), &exprs)?);
        Ok(Self {
            input,
            exprs,
            schema,
        })
    }
}

/// Filter operator.
#[derive(Debug, Clone)]
pub struct FilterOperator {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Filter predicate.
    pub predicate: LogicalExpr,
}

impl FilterOperator {
    /// Creates a filter; the predicate must be boolean.
    pub fn try_new(input: Arc<LogicalOperator>, predicate: LogicalExpr) -> PlanResult<Self> {
        resolver::check_filter(&input.schema(), &predicate)?;
        Ok(Self { input, predicate })
    }

    /// Extracts conjuncts (ANDed conditions) from the predicate.
    pub fn conjuncts(&self) -> Vec<&LogicalExpr> {
        extract_conjuncts(&self.predicate)
    }
}

/// Extracts all conjuncts from an expression.
pub fn extract_conjuncts(expr: &LogicalExpr) -> Vec<&LogicalExpr> {
    match expr {
        LogicalExpr::BinaryOp {
            left,
            op: BinaryOp::And,
            right,
        } => {
            let mut result = extract_conjuncts(left);
            result.extend(extract_conjuncts(right));
            result
        }
        _ => vec![expr],
    }
}

/// Combines expressions with AND.
pub fn conjoin(exprs: Vec<LogicalExpr>) -> Option<LogicalExpr> {
    exprs.into_iter().reduce(|a, b| a.and(b))
}

/// Join operator.
#[derive(Debug, Clone)]
pub struct JoinOperator {
    /// Left input.
    pub left: Arc<LogicalOperator>,
    /// Right input.
    pub right: Arc<LogicalOperator>,
    /// Join type.
    pub join_type: JoinType,
    /// Join condition.
    pub condition: JoinCondition,
    /// Output schema.
    pub schema: SchemaRef,
    /// Origin of each output field.
    pub outputs: Vec<JoinColumn>,
}

impl JoinOperator {
    /// Creates a new join operator.
    pub fn try_new(
        left: Arc<LogicalOperator>,
        right: Arc<LogicalOperator>,
        join_type: JoinType,
        condition: JoinCondition,
    ) -> PlanResult<Self> {
        let (schema, outputs) =
            resolver::join_schema(&left.schema(), &right.schema(), join_type, &condition)?;
        Ok(Self {
            left,
            right,
            join_type,
            condition,
            schema: Arc::new(schema),
            outputs,
        })
    }

    /// Returns the `USING` keys, if any.
    pub fn using_keys(&self) -> &[String] {
        match &self.condition {
            JoinCondition::Using(keys) => keys,
            _ => &[],
        }
    }
}

/// Aggregate operator.
#[derive(Debug, Clone)]
pub struct AggregateOperator {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Group-by expressions.
    pub group_by: Vec<LogicalExpr>,
    /// Aggregate expressions.
    pub aggregates: Vec<LogicalExpr>,
    /// Output schema.
    pub schema: SchemaRef,
}

impl AggregateOperator {
    /// Creates an aggregation.
    pub fn try_new(
        input: Arc<LogicalOperator>,
        group_by: Vec<LogicalExpr>,
        aggregates: Vec<LogicalExpr>,
    ) -> PlanResult<Self> {
        let schema = Arc::new(resolver::aggregate_schema(
            &input.schema(),
            &group_by,
            &aggregates,
        )?);
        Ok(Self {
            input,
            group_by,
            aggregates,
            schema,
        })
    }

    /// Group-by expressions followed by aggregate expressions.
    pub fn output_exprs(&self) -> impl Iterator<Item = &LogicalExpr> {
        self.group_by.iter().chain(self.aggregates.iter())
    }
}

/// Sort operator.
#[derive(Debug, Clone)]
pub struct SortOperator {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Sort expressions.
    pub order_by: Vec<SortExpr>,
}

impl SortOperator {
    /// Creates a sort; keys must be orderable.
    pub fn try_new(input: Arc<LogicalOperator>, order_by: Vec<SortExpr>) -> PlanResult<Self> {
        resolver::check_sort(&input.schema(), &order_by)?;
        Ok(Self { input, order_by })
    }
}

/// Limit operator.
#[derive(Debug, Clone)]
pub struct LimitOperator {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Number of rows to skip.
    pub offset: u64,
    /// Maximum number of rows to return.
    pub fetch: Option<u64>,
}

impl LimitOperator {
    /// Creates a limit.
    pub fn new(input: Arc<LogicalOperator>, offset: u64, fetch: Option<u64>) -> Self {
        Self {
            input,
            offset,
            fetch,
        }
    }
}

/// Distinct operator.
#[derive(Debug, Clone)]
pub struct DistinctOperator {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
}

impl DistinctOperator {
    /// Creates a distinct over all columns.
    pub fn new(input: Arc<LogicalOperator>) -> Self {
        Self { input }
    }
}

/// Set operation operator.
#[derive(Debug, Clone)]
pub struct SetOperationOperator {
    /// Left input.
    pub left: Arc<LogicalOperator>,
    /// Right input.
    pub right: Arc<LogicalOperator>,
    /// Operation type.
    pub op: SetOpType,
    /// Output schema.
    pub schema: SchemaRef,
}

impl SetOperationOperator {
    /// Creates a set operation; arities must match.
    pub fn try_new(
        left: Arc<LogicalOperator>,
        right: Arc<LogicalOperator>,
        op: SetOpType,
    ) -> PlanResult<Self> {
        let schema = Arc::new(resolver::set_operation_schema(
            &left.schema(),
            &right.schema(),
            op,
        )?);
        Ok(Self {
            left,
            right,
            op,
            schema,
        })
    }
}

/// Subquery alias operator.
#[derive(Debug, Clone)]
pub struct SubqueryAliasOperator {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Alias name.
    pub alias: String,
    /// Aliased schema.
    pub schema: SchemaRef,
}

impl SubqueryAliasOperator {
    /// Creates an alias; every output field is requalified by `alias`.
    pub fn try_new(input: Arc<LogicalOperator>, alias: impl Into<String>) -> PlanResult<Self> {
        let alias = alias.into();
        let schema = Arc::new(resolver::alias_schema(&input.schema(), &alias)?);
        Ok(Self {
            input,
            alias,
            schema,
        })
    }
}

/// Values operator (inline data).
#[derive(Debug, Clone)]
pub struct ValuesOperator {
    /// Rows of values.
    pub values: Vec<Vec<LogicalExpr>>,
    /// Schema.
    pub schema: SchemaRef,
}

impl ValuesOperator {
    /// Creates a literal row set.
    pub fn try_new(names: &[String], values: Vec<Vec<LogicalExpr>>) -> PlanResult<Self> {
        let schema = Arc::new(resolver::values_schema(names, &values)?);
        Ok(Self { values, schema })
    }
}

/// Empty relation operator.
#[derive(Debug, Clone)]
pub struct EmptyRelationOperator {
    /// Schema.
    pub schema: SchemaRef,
}

impl EmptyRelationOperator {
    /// Creates an empty relation with the given schema.
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }
}

/// Fields of `schema` wrapped for display.
pub(crate) fn schema_summary(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| f.qualified_name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::schema::Field;
    use crate::types::DataType;

    fn users() -> Arc<LogicalOperator> {
        Arc::new(LogicalOperator::Scan(ScanOperator::new(TableMeta::new(
            "users",
            Schema::new(vec![
                Field::not_null("id", DataType::Int),
                Field::nullable("name", DataType::Varchar(Some(255))),
                Field::nullable("age", DataType::Int),
            ]),
        ))))
    }

    #[test]
    fn test_scan_operator() {
        let scan = ScanOperator::new(TableMeta::new(
            "public.users",
            Schema::new(vec![Field::not_null("id", DataType::Int)]),
        ));
        assert_eq!(scan.table.name.to_string(), "public.users");
        assert_eq!(
            scan.projected_schema.field(0).unwrap().qualified_name(),
            "users.id"
        );
    }

    #[test]
    fn test_scan_with_projection() {
        let LogicalOperator::Scan(scan) = users().as_ref().clone() else {
            unreachable!()
        };
        let narrowed = scan.with_projection(&[2, 0]).unwrap();
        assert_eq!(narrowed.projected_schema.names(), vec!["age", "id"]);

        let again = narrowed.with_projection(&[1]).unwrap();
        assert_eq!(again.projection, Some(vec![0]));
        assert!(narrowed.with_projection(&[5]).is_err());
        assert!(scan.with_projection(&[]).is_err());
    }

    #[test]
    fn test_join_type_properties() {
        assert!(JoinType::Full.is_outer());
        assert!(!JoinType::Inner.is_outer());
        assert!(JoinType::Anti.is_semi_or_anti());
        assert_eq!(JoinType::Left.nullable_sides(), (false, true));
    }

    #[test]
    fn test_schema_shared_through_filter() {
        let input = users();
        let filter = LogicalOperator::Filter(
            FilterOperator::try_new(
                input.clone(),
                LogicalExpr::col("age").gt(LogicalExpr::lit_i64(21)),
            )
            .unwrap(),
        );
        assert!(Arc::ptr_eq(&filter.schema(), &input.schema()));
    }

    #[test]
    fn test_with_new_inputs_revalidates() {
        let projection = LogicalOperator::Projection(
            ProjectionOperator::try_new(users(), vec![LogicalExpr::col("age")]).unwrap(),
        );
        let other = Arc::new(LogicalOperator::EmptyRelation(EmptyRelationOperator::new(
            Arc::new(Schema::new(vec![Field::not_null("x", DataType::Int)])),
        )));
        assert!(matches!(
            projection.with_new_inputs(vec![other]),
            Err(PlanError::ColumnNotFound(_))
        ));
        assert!(projection.with_new_inputs(vec![]).is_err());
        assert!(projection.with_new_inputs(vec![users()]).is_ok());
    }

    #[test]
    fn test_extract_conjuncts() {
        let expr = LogicalExpr::col("a")
            .eq(LogicalExpr::lit_i64(1))
            .and(LogicalExpr::col("b").gt(LogicalExpr::lit_i64(2)))
            .and(LogicalExpr::col("c").is_not_null());

        let conjuncts = extract_conjuncts(&expr);
        assert_eq!(conjuncts.len(), 3);
    }

    #[test]
    fn test_conjoin() {
        let exprs = vec![
            LogicalExpr::col("a").eq(LogicalExpr::lit_i64(1)),
            LogicalExpr::col("b").eq(LogicalExpr::lit_i64(2)),
        ];
        let combined = conjoin(exprs);
        assert!(matches!(
            combined,
            Some(LogicalExpr::BinaryOp {
                op: BinaryOp::And,
                ..
            })
        ));
        assert!(conjoin(vec![]).is_none());
    }
}
