//! Schema resolution.
//!
//! Every plan node computes its output schema here, once, when it is built.
//! Column references are bound through a [`Scope`] chain: the innermost
//! schema first, then its parents. Resolution is exact and case-sensitive.

use quarry_common::{LEFT_QUALIFIER, RIGHT_QUALIFIER};

use super::catalog::TableMeta;
use super::error::{PlanError, PlanResult};
use super::expr::{BinaryOp, FunctionCall, LogicalExpr, SortExpr, UnaryOp};
use super::operator::{JoinColumn, JoinCondition, JoinType, SetOpType};
use super::plan::LogicalPlan;
use super::schema::{Column, Field, Schema};
use crate::functions::{self, ArgumentKind, FunctionKind};
use crate::types::DataType;

/// A chain of schemas visible to an expression, innermost first.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    schema: &'a Schema,
    parent: Option<&'a Scope<'a>>,
}

/// A column reference bound to a field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    /// Scope level (0 = innermost).
    pub depth: usize,
    /// Field index within that level's schema.
    pub index: usize,
    /// Field type.
    pub data_type: DataType,
    /// Field nullability.
    pub nullable: bool,
}

impl<'a> Scope<'a> {
    /// Creates a single-level scope.
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            parent: None,
        }
    }

    /// Creates a scope nested inside `parent`.
    pub fn with_parent(schema: &'a Schema, parent: &'a Scope<'a>) -> Self {
        Self {
            schema,
            parent: Some(parent),
        }
    }

    /// Returns the innermost schema.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Binds a column reference. A reference matching more than one field,
    /// in one level or across levels, is ambiguous.
    pub fn resolve(&self, column: &Column) -> PlanResult<ResolvedColumn> {
        let mut found = None;
        let mut candidates = Vec::new();
        let mut level = Some(self);
        let mut depth = 0;
        while let Some(scope) = level {
            for index in scope.schema.matches(column) {
                let field = &scope.schema.fields()[index];
                candidates.push(field.qualified_name());
                if found.is_none() {
                    found = Some(ResolvedColumn {
                        depth,
                        index,
                        data_type: field.data_type.clone(),
                        nullable: field.nullable,
                    });
                }
            }
            level = scope.parent;
            depth += 1;
        }
        if candidates.len() > 1 {
            return Err(PlanError::ColumnAmbiguous {
                name: column.qualified_name(),
                candidates,
            });
        }
        found.ok_or_else(|| PlanError::ColumnNotFound(column.qualified_name()))
    }
}

/// Type and nullability of a resolved expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprType {
    /// Declared type.
    pub data_type: DataType,
    /// Whether the expression may evaluate to NULL.
    pub nullable: bool,
}

impl ExprType {
    fn new(data_type: DataType, nullable: bool) -> Self {
        Self {
            data_type,
            nullable,
        }
    }
}

// =============================================================================
// Expression typing
// =============================================================================

/// Checks that `t` can be an operand of `op` at all.
pub fn check_operand(op: BinaryOp, t: &DataType) -> PlanResult<()> {
    let ok = match op {
        BinaryOp::And | BinaryOp::Or => t.is_boolean_like(),
        BinaryOp::Like | BinaryOp::NotLike | BinaryOp::Concat => t.is_string() || t.is_null(),
        BinaryOp::Plus | BinaryOp::Minus => t.is_numeric() || t.is_temporal() || t.is_null(),
        BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
            t.is_numeric() || t.is_null()
        }
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(PlanError::type_mismatch(format!(
            "operator {} cannot be applied to {}",
            op, t
        )))
    }
}

/// Computes the result type of `left op right`.
pub fn binary_type(op: BinaryOp, left: &DataType, right: &DataType) -> PlanResult<DataType> {
    check_operand(op, left)?;
    check_operand(op, right)?;
    let mismatch = || {
        PlanError::type_mismatch(format!(
            "operator {} cannot combine {} and {}",
            op, left, right
        ))
    };
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Like | BinaryOp::NotLike => Ok(DataType::Boolean),
        op if op.is_comparison() => {
            if left.is_comparable_with(right) {
                Ok(DataType::Boolean)
            } else {
                Err(mismatch())
            }
        }
        BinaryOp::Concat => Ok(DataType::Varchar(None)),
        _ => {
            let numeric = |t: &DataType| t.is_numeric() || t.is_null();
            if numeric(left) && numeric(right) {
                let widened = left.widen(right).ok_or_else(mismatch)?;
                return Ok(match (op, widened) {
                    (BinaryOp::Divide, t @ (DataType::Decimal { .. } | DataType::Null)) => t,
                    (BinaryOp::Divide, _) => DataType::Double,
                    (_, t) => t,
                });
            }
            match (op, left, right) {
                (_, DataType::Interval, DataType::Interval) => Ok(DataType::Interval),
                (_, t, DataType::Interval) => Ok(t.clone()),
                (BinaryOp::Plus, DataType::Interval, t) => Ok(t.clone()),
                (BinaryOp::Minus, a, b) if a.is_temporal() && a == b => Ok(DataType::Interval),
                _ => Err(mismatch()),
            }
        }
    }
}

/// Types `expr` against `scope`.
pub fn resolve_expr(expr: &LogicalExpr, scope: &Scope<'_>) -> PlanResult<ExprType> {
    match expr {
        LogicalExpr::Column(c) => {
            let resolved = scope.resolve(c)?;
            Ok(ExprType::new(resolved.data_type, resolved.nullable))
        }
        LogicalExpr::Literal(lit) => Ok(ExprType::new(lit.data_type(), lit.is_null())),
        LogicalExpr::Alias { expr, name } => {
            if name.is_empty() {
                return Err(PlanError::invalid_argument("alias name cannot be empty"));
            }
            resolve_expr(expr, scope)
        }
        LogicalExpr::BinaryOp { left, op, right } => {
            let l = resolve_expr(left, scope)?;
            let r = resolve_expr(right, scope)?;
            let data_type = binary_type(*op, &l.data_type, &r.data_type)?;
            Ok(ExprType::new(data_type, l.nullable || r.nullable))
        }
        LogicalExpr::UnaryOp { op, expr } => {
            let inner = resolve_expr(expr, scope)?;
            match op {
                UnaryOp::Not if inner.data_type.is_boolean_like() => {
                    Ok(ExprType::new(DataType::Boolean, inner.nullable))
                }
                UnaryOp::Negate
                    if inner.data_type.is_numeric()
                        || inner.data_type.is_null()
                        || inner.data_type == DataType::Interval =>
                {
                    Ok(inner)
                }
                _ => Err(PlanError::type_mismatch(format!(
                    "operator {} cannot be applied to {}",
                    op, inner.data_type
                ))),
            }
        }
        LogicalExpr::IsNull(e) | LogicalExpr::IsNotNull(e) => {
            resolve_expr(e, scope)?;
            Ok(ExprType::new(DataType::Boolean, false))
        }
        LogicalExpr::Between {
            expr, low, high, ..
        } => {
            let e = resolve_expr(expr, scope)?;
            let l = resolve_expr(low, scope)?;
            let h = resolve_expr(high, scope)?;
            for bound in [&l, &h] {
                ensure_comparable(&e.data_type, &bound.data_type)?;
            }
            Ok(ExprType::new(
                DataType::Boolean,
                e.nullable || l.nullable || h.nullable,
            ))
        }
        LogicalExpr::InList { expr, list, .. } => {
            if list.is_empty() {
                return Err(PlanError::invalid_argument("IN list cannot be empty"));
            }
            let e = resolve_expr(expr, scope)?;
            let mut nullable = e.nullable;
            for item in list {
                let t = resolve_expr(item, scope)?;
                ensure_comparable(&e.data_type, &t.data_type)?;
                nullable |= t.nullable;
            }
            Ok(ExprType::new(DataType::Boolean, nullable))
        }
        LogicalExpr::InSubquery { expr, subquery, .. } => {
            let e = resolve_expr(expr, scope)?;
            let field = single_column(subquery)?;
            ensure_comparable(&e.data_type, &field.data_type)?;
            Ok(ExprType::new(DataType::Boolean, true))
        }
        LogicalExpr::Case {
            operand,
            when_then,
            else_result,
        } => resolve_case(operand.as_deref(), when_then, else_result.as_deref(), scope),
        LogicalExpr::Cast { expr, data_type } => {
            let inner = resolve_expr(expr, scope)?;
            Ok(ExprType::new(data_type.clone(), inner.nullable))
        }
        LogicalExpr::Function(call) => resolve_function(call, scope),
        LogicalExpr::ScalarSubquery(plan) => {
            let field = single_column(plan)?;
            Ok(ExprType::new(field.data_type, true))
        }
        LogicalExpr::Exists { .. } => Ok(ExprType::new(DataType::Boolean, false)),
        LogicalExpr::Wildcard => Err(PlanError::invalid_argument(
            "* is only valid as the argument of COUNT",
        )),
    }
}

fn ensure_comparable(a: &DataType, b: &DataType) -> PlanResult<()> {
    if a.is_comparable_with(b) {
        Ok(())
    } else {
        Err(PlanError::type_mismatch(format!(
            "cannot compare {} with {}",
            a, b
        )))
    }
}

fn single_column(plan: &LogicalPlan) -> PlanResult<Field> {
    let schema = plan.schema();
    match schema.fields() {
        [field] => Ok(field.clone()),
        fields => Err(PlanError::invalid_argument(format!(
            "subquery must return exactly one column, got {}",
            fields.len()
        ))),
    }
}

fn resolve_case(
    operand: Option<&LogicalExpr>,
    when_then: &[(LogicalExpr, LogicalExpr)],
    else_result: Option<&LogicalExpr>,
    scope: &Scope<'_>,
) -> PlanResult<ExprType> {
    if when_then.is_empty() {
        return Err(PlanError::invalid_argument(
            "CASE requires at least one WHEN branch",
        ));
    }
    let operand = operand.map(|o| resolve_expr(o, scope)).transpose()?;
    let mut result: Option<DataType> = None;
    let mut nullable = else_result.is_none();
    let mut branches: Vec<&LogicalExpr> = Vec::with_capacity(when_then.len() + 1);

    for (when, then) in when_then {
        let w = resolve_expr(when, scope)?;
        match &operand {
            Some(o) => ensure_comparable(&o.data_type, &w.data_type)?,
            None if !w.data_type.is_boolean_like() => {
                return Err(PlanError::type_mismatch(format!(
                    "CASE condition must be BOOLEAN, got {}",
                    w.data_type
                )))
            }
            None => {}
        }
        branches.push(then);
    }
    branches.extend(else_result);

    for branch in branches {
        let t = resolve_expr(branch, scope)?;
        nullable |= t.nullable;
        result = Some(match result {
            None => t.data_type,
            Some(acc) => acc.widen(&t.data_type).ok_or_else(|| {
                PlanError::type_mismatch(format!(
                    "CASE branches have incompatible types {} and {}",
                    acc, t.data_type
                ))
            })?,
        });
    }
    Ok(ExprType::new(result.unwrap_or(DataType::Null), nullable))
}

fn resolve_function(call: &FunctionCall, scope: &Scope<'_>) -> PlanResult<ExprType> {
    if call.name.is_empty() {
        return Err(PlanError::invalid_argument(
            "OVER can only be applied to a function call",
        ));
    }
    let sig = functions::lookup(&call.name)
        .ok_or_else(|| PlanError::UnknownFunction(call.name.clone()))?;
    if !sig.accepts(call.args.len()) {
        return Err(PlanError::invalid_argument(format!(
            "{} expects {} argument(s), got {}",
            sig.name,
            sig.arity(),
            call.args.len()
        )));
    }
    match (sig.kind, &call.window) {
        (FunctionKind::Window, None) => {
            return Err(PlanError::invalid_argument(format!(
                "{} requires an OVER clause",
                sig.name
            )))
        }
        (FunctionKind::Scalar, Some(_)) => {
            return Err(PlanError::invalid_argument(format!(
                "{} is not an aggregate or window function",
                sig.name
            )))
        }
        _ => {}
    }
    if call.distinct && sig.kind != FunctionKind::Aggregate {
        return Err(PlanError::invalid_argument(format!(
            "DISTINCT is not valid for {}",
            sig.name
        )));
    }

    let mut arg_types = Vec::with_capacity(call.args.len());
    let mut arg_nulls = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        if matches!(arg, LogicalExpr::Wildcard) && sig.name == "count" {
            continue;
        }
        let t = resolve_expr(arg, scope)?;
        arg_types.push(t.data_type);
        arg_nulls.push(t.nullable);
    }

    let bad_arg = match sig.arguments {
        ArgumentKind::Any => None,
        ArgumentKind::Numeric => arg_types.iter().find(|t| !(t.is_numeric() || t.is_null())),
        ArgumentKind::String => arg_types.first().filter(|t| !(t.is_string() || t.is_null())),
    };
    if let Some(t) = bad_arg {
        return Err(PlanError::type_mismatch(format!(
            "{} cannot be applied to {}",
            sig.name, t
        )));
    }
    let data_type = sig.return_type(&arg_types).ok_or_else(|| {
        PlanError::type_mismatch(format!("incompatible argument types for {}", sig.name))
    })?;

    if let Some(window) = &call.window {
        let nested = call
            .args
            .iter()
            .chain(window.partition_by.iter())
            .chain(window.order_by.iter().map(|s| &s.expr))
            .any(|e| e.contains_window());
        if nested {
            return Err(PlanError::invalid_aggregation(
                "window functions cannot be nested",
            ));
        }
        for expr in &window.partition_by {
            resolve_expr(expr, scope)?;
        }
        for key in &window.order_by {
            resolve_sort_key(key, scope)?;
        }
        if let Some(frame) = &window.frame {
            if !frame.is_well_ordered() {
                return Err(PlanError::invalid_argument(format!(
                    "invalid window frame: {}",
                    frame
                )));
            }
        }
    }

    Ok(ExprType::new(data_type, sig.result_nullable(&arg_nulls)))
}

fn resolve_sort_key(key: &SortExpr, scope: &Scope<'_>) -> PlanResult<ExprType> {
    let t = resolve_expr(&key.expr, scope)?;
    if !t.data_type.is_orderable() {
        return Err(PlanError::type_mismatch(format!(
            "cannot sort by {} of type {}",
            key.expr, t.data_type
        )));
    }
    Ok(t)
}

/// Output column for an expression: plain references keep the input
/// field's qualifiers, everything else gets an unqualified derived name.
fn output_column(expr: &LogicalExpr, scope: &Scope<'_>) -> PlanResult<Column> {
    match expr {
        LogicalExpr::Column(c) => {
            let resolved = scope.resolve(c)?;
            Ok(scope.schema().fields()[resolved.index].column.clone())
        }
        other => Ok(Column::new(other.output_name())),
    }
}

// =============================================================================
// Operator schemas
// =============================================================================

/// Schema of a scan: the table's fields qualified by its short name.
pub fn scan_schema(table: &TableMeta) -> Schema {
    table.schema.with_qualifier(table.qualifier())
}

/// Schema of a projection.
pub fn projection_schema(input: &Schema, exprs: &[LogicalExpr]) -> PlanResult<Schema> {
    if exprs.is_empty() {
        return Err(PlanError::InvalidPlan(
            "projection requires at least one expression".to_string(),
        ));
    }
    let scope = Scope::new(input);
    let mut fields = Vec::with_capacity(exprs.len());
    for expr in exprs {
        if expr.contains_aggregate() {
            return Err(PlanError::invalid_aggregation(format!(
                "aggregate {} is only valid in an aggregation",
                expr
            )));
        }
        let t = resolve_expr(expr, &scope)?;
        fields.push(Field::new(output_column(expr, &scope)?, t.data_type, t.nullable));
    }
    Ok(Schema::new(fields))
}

/// Validates a filter predicate against the input schema.
pub fn check_filter(input: &Schema, predicate: &LogicalExpr) -> PlanResult<()> {
    if predicate.contains_aggregate() || predicate.contains_window() {
        return Err(PlanError::invalid_aggregation(format!(
            "filter predicate {} cannot contain aggregate or window functions",
            predicate
        )));
    }
    let t = resolve_expr(predicate, &Scope::new(input))?;
    if !t.data_type.is_boolean_like() {
        return Err(PlanError::type_mismatch(format!(
            "filter predicate must be BOOLEAN, got {}",
            t.data_type
        )));
    }
    Ok(())
}

/// Validates sort keys against the input schema.
pub fn check_sort(input: &Schema, order_by: &[SortExpr]) -> PlanResult<()> {
    if order_by.is_empty() {
        return Err(PlanError::InvalidPlan(
            "sort requires at least one key".to_string(),
        ));
    }
    let scope = Scope::new(input);
    for key in order_by {
        if key.expr.contains_aggregate() || key.expr.contains_window() {
            return Err(PlanError::invalid_aggregation(format!(
                "sort key {} cannot contain aggregate or window functions",
                key.expr
            )));
        }
        resolve_sort_key(key, &scope)?;
    }
    Ok(())
}

/// Both join inputs with their side qualifiers, concatenated. Join
/// conditions are resolved against this namespace.
pub fn join_namespace(left: &Schema, right: &Schema) -> Schema {
    left.with_qualifier(LEFT_QUALIFIER)
        .merge(&right.with_qualifier(RIGHT_QUALIFIER))
}

fn unique_key_index(schema: &Schema, key: &str) -> PlanResult<usize> {
    let reference = Column::new(key);
    match schema.matches(&reference).as_slice() {
        [] => Err(PlanError::ColumnNotFound(key.to_string())),
        [index] => Ok(*index),
        many => Err(PlanError::ColumnAmbiguous {
            name: key.to_string(),
            candidates: many
                .iter()
                .map(|i| schema.fields()[*i].qualified_name())
                .collect(),
        }),
    }
}

/// Schema of a join plus the origin of every output field.
pub fn join_schema(
    left: &Schema,
    right: &Schema,
    join_type: JoinType,
    condition: &JoinCondition,
) -> PlanResult<(Schema, Vec<JoinColumn>)> {
    match (join_type, condition) {
        (JoinType::Cross, JoinCondition::None) => {}
        (JoinType::Cross, _) => {
            return Err(PlanError::InvalidPlan(
                "cross join takes no condition".to_string(),
            ))
        }
        (_, JoinCondition::None) => {
            return Err(PlanError::InvalidPlan(format!(
                "{} join requires a condition",
                join_type
            )))
        }
        _ => {}
    }

    let left_q = left.with_qualifier(LEFT_QUALIFIER);
    let right_q = right.with_qualifier(RIGHT_QUALIFIER);
    let mut using_keys: Vec<(usize, usize, DataType)> = Vec::new();

    match condition {
        JoinCondition::On(expr) => {
            if expr.contains_aggregate() || expr.contains_window() {
                return Err(PlanError::invalid_aggregation(
                    "join condition cannot contain aggregate or window functions",
                ));
            }
            let t = if join_type.is_semi_or_anti() {
                let outer = Scope::new(&left_q);
                resolve_expr(expr, &Scope::with_parent(&right_q, &outer))?
            } else {
                let namespace = left_q.merge(&right_q);
                resolve_expr(expr, &Scope::new(&namespace))?
            };
            if !t.data_type.is_boolean_like() {
                return Err(PlanError::type_mismatch(format!(
                    "join condition must be BOOLEAN, got {}",
                    t.data_type
                )));
            }
        }
        JoinCondition::Using(keys) => {
            if keys.is_empty() {
                return Err(PlanError::InvalidPlan(
                    "USING requires at least one key".to_string(),
                ));
            }
            for (i, key) in keys.iter().enumerate() {
                if keys[..i].contains(key) {
                    return Err(PlanError::invalid_argument(format!(
                        "duplicate USING key {}",
                        key
                    )));
                }
                let li = unique_key_index(left, key)?;
                let ri = unique_key_index(right, key)?;
                let lt = &left.fields()[li].data_type;
                let rt = &right.fields()[ri].data_type;
                let widened = lt.widen(rt).ok_or_else(|| {
                    PlanError::type_mismatch(format!(
                        "USING key {} has incompatible types {} and {}",
                        key, lt, rt
                    ))
                })?;
                using_keys.push((li, ri, widened));
            }
        }
        JoinCondition::None => {}
    }

    let mut fields = Vec::new();
    let mut outputs = Vec::new();

    if join_type.is_semi_or_anti() {
        for (i, field) in left_q.fields().iter().enumerate() {
            fields.push(field.clone());
            outputs.push(JoinColumn::Left(i));
        }
        return Ok((Schema::new(fields), outputs));
    }

    for (li, ri, data_type) in &using_keys {
        let lf = &left_q.fields()[*li];
        let rf = &right_q.fields()[*ri];
        let column = rf
            .column
            .qualifiers
            .iter()
            .fold(lf.column.clone(), |c, q| c.with_qualifier(q.clone()));
        let (output, nullable) = match join_type {
            JoinType::Right => (JoinColumn::Right(*ri), rf.nullable),
            JoinType::Full => (JoinColumn::Coalesce(*li, *ri), lf.nullable && rf.nullable),
            _ => (JoinColumn::Left(*li), lf.nullable),
        };
        fields.push(Field::new(column, data_type.clone(), nullable));
        outputs.push(output);
    }

    let (left_nullable, right_nullable) = join_type.nullable_sides();
    for (i, field) in left_q.fields().iter().enumerate() {
        if using_keys.iter().any(|(li, _, _)| *li == i) {
            continue;
        }
        fields.push(field.with_nullable(field.nullable || left_nullable));
        outputs.push(JoinColumn::Left(i));
    }
    for (j, field) in right_q.fields().iter().enumerate() {
        if using_keys.iter().any(|(_, ri, _)| *ri == j) {
            continue;
        }
        fields.push(field.with_nullable(field.nullable || right_nullable));
        outputs.push(JoinColumn::Right(j));
    }
    Ok((Schema::new(fields), outputs))
}

/// Schema of an aggregation: group-by fields, then aggregate fields.
pub fn aggregate_schema(
    input: &Schema,
    group_by: &[LogicalExpr],
    aggregates: &[LogicalExpr],
) -> PlanResult<Schema> {
    if group_by.is_empty() && aggregates.is_empty() {
        return Err(PlanError::InvalidPlan(
            "aggregation requires group-by or aggregate expressions".to_string(),
        ));
    }
    let scope = Scope::new(input);
    let mut fields = Vec::with_capacity(group_by.len() + aggregates.len());
    let mut grouped_indices = Vec::new();

    for expr in group_by {
        if expr.contains_aggregate() || expr.contains_window() {
            return Err(PlanError::invalid_aggregation(format!(
                "group-by expression {} cannot contain aggregate or window functions",
                expr
            )));
        }
        let t = resolve_expr(expr, &scope)?;
        if let LogicalExpr::Column(c) = expr.unalias() {
            grouped_indices.push(scope.resolve(c)?.index);
        }
        fields.push(Field::new(output_column(expr, &scope)?, t.data_type, t.nullable));
    }

    let grouped: Vec<&LogicalExpr> = group_by.iter().map(LogicalExpr::unalias).collect();
    for expr in aggregates {
        if expr.contains_window() {
            return Err(PlanError::invalid_aggregation(format!(
                "window function in aggregation: {}",
                expr
            )));
        }
        check_grouping(expr.unalias(), &grouped, &grouped_indices, &scope)?;
        let t = resolve_expr(expr, &scope)?;
        fields.push(Field::new(output_column(expr, &scope)?, t.data_type, t.nullable));
    }
    Ok(Schema::new(fields))
}

fn check_grouping(
    expr: &LogicalExpr,
    grouped: &[&LogicalExpr],
    grouped_indices: &[usize],
    scope: &Scope<'_>,
) -> PlanResult<()> {
    if grouped.iter().any(|g| *g == expr) {
        return Ok(());
    }
    match expr {
        LogicalExpr::Function(call) if expr.is_aggregate_call() => {
            if call.args.iter().any(LogicalExpr::contains_aggregate) {
                return Err(PlanError::invalid_aggregation(format!(
                    "aggregate functions cannot be nested: {}",
                    expr
                )));
            }
            Ok(())
        }
        LogicalExpr::Column(c) => {
            let resolved = scope.resolve(c)?;
            if grouped_indices.contains(&resolved.index) {
                Ok(())
            } else {
                Err(PlanError::invalid_aggregation(format!(
                    "column {} must appear in group_by or inside an aggregate function",
                    c
                )))
            }
        }
        other => other
            .children()
            .into_iter()
            .try_for_each(|child| check_grouping(child, grouped, grouped_indices, scope)),
    }
}

/// Schema of a set operation: left names, widened types, OR-ed nullability.
pub fn set_operation_schema(left: &Schema, right: &Schema, op: SetOpType) -> PlanResult<Schema> {
    if left.len() != right.len() {
        return Err(PlanError::type_mismatch(format!(
            "{} operands have {} and {} columns",
            op,
            left.len(),
            right.len()
        )));
    }
    let mut fields = Vec::with_capacity(left.len());
    for (l, r) in left.fields().iter().zip(right.fields()) {
        let data_type = l.data_type.widen(&r.data_type).ok_or_else(|| {
            PlanError::type_mismatch(format!(
                "{} column {} has incompatible types {} and {}",
                op,
                l.name(),
                l.data_type,
                r.data_type
            ))
        })?;
        fields.push(Field::new(l.column.clone(), data_type, l.nullable || r.nullable));
    }
    Ok(Schema::new(fields))
}

/// Schema of a literal row set; column types are widened across rows.
pub fn values_schema(names: &[String], rows: &[Vec<LogicalExpr>]) -> PlanResult<Schema> {
    if names.is_empty() || rows.is_empty() {
        return Err(PlanError::InvalidPlan(
            "VALUES requires at least one column and one row".to_string(),
        ));
    }
    let empty = Schema::empty();
    let scope = Scope::new(&empty);
    let mut types: Vec<Option<ExprType>> = vec![None; names.len()];

    for (r, row) in rows.iter().enumerate() {
        if row.len() != names.len() {
            return Err(PlanError::type_mismatch(format!(
                "VALUES row {} has {} values, expected {}",
                r,
                row.len(),
                names.len()
            )));
        }
        for (i, expr) in row.iter().enumerate() {
            if expr.contains_aggregate() || expr.contains_window() {
                return Err(PlanError::invalid_aggregation(
                    "VALUES cannot contain aggregate or window functions",
                ));
            }
            let t = resolve_expr(expr, &scope)?;
            types[i] = Some(match types[i].take() {
                None => t,
                Some(acc) => {
                    let data_type = acc.data_type.widen(&t.data_type).ok_or_else(|| {
                        PlanError::type_mismatch(format!(
                            "VALUES column {} has incompatible types {} and {}",
                            names[i], acc.data_type, t.data_type
                        ))
                    })?;
                    ExprType::new(data_type, acc.nullable || t.nullable)
                }
            });
        }
    }

    let fields = names
        .iter()
        .zip(types)
        .map(|(name, t)| {
            let t = t.unwrap_or_else(|| ExprType::new(DataType::Null, true));
            Field::new(Column::new(name.clone()), t.data_type, t.nullable)
        })
        .collect();
    Ok(Schema::new(fields))
}

/// Schema seen through a subquery alias.
pub fn alias_schema(input: &Schema, alias: &str) -> PlanResult<Schema> {
    if alias.is_empty() {
        return Err(PlanError::invalid_argument("alias name cannot be empty"));
    }
    Ok(input.with_alias(alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::expr::WindowSpec;

    fn users() -> Schema {
        Schema::new(vec![
            Field::not_null("id", DataType::Int),
            Field::nullable("name", DataType::Varchar(Some(64))),
            Field::nullable("age", DataType::Int),
        ])
        .with_qualifier("users")
    }

    fn orders() -> Schema {
        Schema::new(vec![
            Field::not_null("id", DataType::Int),
            Field::not_null("user_id", DataType::BigInt),
            Field::nullable("amount", DataType::Double),
        ])
        .with_qualifier("orders")
    }

    #[test]
    fn test_scope_resolution() {
        let schema = users();
        let scope = Scope::new(&schema);
        let resolved = scope.resolve(&Column::new("age")).unwrap();
        assert_eq!(resolved.index, 2);
        assert!(resolved.nullable);
        assert!(matches!(
            scope.resolve(&Column::new("missing")),
            Err(PlanError::ColumnNotFound(_))
        ));
        assert!(matches!(
            scope.resolve(&Column::new("Age")),
            Err(PlanError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_scope_ambiguity_across_levels() {
        let outer_schema = users();
        let inner_schema = orders();
        let outer = Scope::new(&outer_schema);
        let inner = Scope::with_parent(&inner_schema, &outer);

        let err = inner.resolve(&Column::new("id")).unwrap_err();
        assert!(matches!(err, PlanError::ColumnAmbiguous { .. }));

        let resolved = inner.resolve(&Column::new("name")).unwrap();
        assert_eq!(resolved.depth, 1);
        assert_eq!(inner.resolve(&Column::qualified("orders", "id")).unwrap().depth, 0);
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(
            binary_type(BinaryOp::Plus, &DataType::Int, &DataType::BigInt).unwrap(),
            DataType::BigInt
        );
        assert_eq!(
            binary_type(BinaryOp::Divide, &DataType::Int, &DataType::Int).unwrap(),
            DataType::Double
        );
        assert_eq!(
            binary_type(BinaryOp::Eq, &DataType::Int, &DataType::Double).unwrap(),
            DataType::Boolean
        );
        assert_eq!(
            binary_type(BinaryOp::Plus, &DataType::Date, &DataType::Interval).unwrap(),
            DataType::Date
        );
        assert!(binary_type(BinaryOp::Eq, &DataType::Int, &DataType::Text).is_err());
        assert!(binary_type(BinaryOp::And, &DataType::Int, &DataType::Boolean).is_err());
        assert!(binary_type(BinaryOp::Multiply, &DataType::Date, &DataType::Int).is_err());
    }

    #[test]
    fn test_resolve_function() {
        let schema = orders();
        let scope = Scope::new(&schema);

        let sum = LogicalExpr::call("sum", vec![LogicalExpr::col("amount")]);
        let t = resolve_expr(&sum, &scope).unwrap();
        assert_eq!(t.data_type, DataType::Double);
        assert!(t.nullable);

        let upper = LogicalExpr::call("upper", vec![LogicalExpr::col("amount")]);
        assert!(matches!(
            resolve_expr(&upper, &scope),
            Err(PlanError::TypeMismatch(_))
        ));

        let rank = LogicalExpr::call("rank", vec![]);
        assert!(matches!(
            resolve_expr(&rank, &scope),
            Err(PlanError::InvalidArgument(_))
        ));
        let rank = rank.over(WindowSpec::new().order_by(vec![LogicalExpr::col("id").asc()]));
        assert_eq!(resolve_expr(&rank, &scope).unwrap().data_type, DataType::BigInt);

        let bad_over = LogicalExpr::col("id").over(WindowSpec::new());
        assert!(matches!(
            resolve_expr(&bad_over, &scope),
            Err(PlanError::InvalidArgument(_))
        ));

        let unknown = LogicalExpr::call("frobnicate", vec![]);
        assert!(matches!(
            resolve_expr(&unknown, &scope),
            Err(PlanError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_resolve_case() {
        let schema = users();
        let scope = Scope::new(&schema);
        let case = LogicalExpr::case(
            None,
            vec![(
                LogicalExpr::col("age").gt(LogicalExpr::lit_i64(18)),
                LogicalExpr::lit_str("adult"),
            )],
            Some(LogicalExpr::lit_str("minor")),
        );
        let t = resolve_expr(&case, &scope).unwrap();
        assert_eq!(t.data_type, DataType::Varchar(None));
        assert!(!t.nullable);

        let bad = LogicalExpr::case(
            None,
            vec![(LogicalExpr::col("age"), LogicalExpr::lit_i64(1))],
            None,
        );
        assert!(matches!(
            resolve_expr(&bad, &scope),
            Err(PlanError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_projection_schema() {
        let schema = users();
        let exprs = vec![
            LogicalExpr::col("id"),
            LogicalExpr::col("age").add(LogicalExpr::lit_i64(1)),
            LogicalExpr::col("name").alias("n"),
        ];
        let out = projection_schema(&schema, &exprs).unwrap();
        assert_eq!(out.field(0).unwrap().qualified_name(), "users.id");
        assert_eq!(out.field(1).unwrap().qualified_name(), "(age + 1)");
        assert_eq!(out.field(1).unwrap().data_type, DataType::BigInt);
        assert_eq!(out.field(2).unwrap().qualified_name(), "n");

        let agg = vec![LogicalExpr::call("sum", vec![LogicalExpr::col("age")])];
        assert!(matches!(
            projection_schema(&schema, &agg),
            Err(PlanError::InvalidAggregation(_))
        ));
    }

    #[test]
    fn test_filter_and_sort_checks() {
        let schema = users();
        assert!(check_filter(&schema, &LogicalExpr::col("age").gt(LogicalExpr::lit_i64(1))).is_ok());
        assert!(matches!(
            check_filter(&schema, &LogicalExpr::col("age")),
            Err(PlanError::TypeMismatch(_))
        ));
        assert!(check_sort(&schema, &[LogicalExpr::col("name").desc()]).is_ok());

        let json = Schema::new(vec![Field::nullable("doc", DataType::Json)]);
        assert!(matches!(
            check_sort(&json, &[LogicalExpr::col("doc").asc()]),
            Err(PlanError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_join_schema_qualifies_sides() {
        let condition = JoinCondition::On(
            LogicalExpr::col("users.id").eq(LogicalExpr::col("orders.user_id")),
        );
        let (schema, outputs) =
            join_schema(&users(), &orders(), JoinType::Left, &condition).unwrap();
        assert_eq!(schema.len(), 6);
        assert_eq!(outputs[3], JoinColumn::Right(0));
        assert_eq!(schema.field(0).unwrap().qualified_name(), "left.users.id");
        assert_eq!(schema.field(3).unwrap().qualified_name(), "right.orders.id");
        assert!(schema.field(3).unwrap().nullable);

        let scope = Scope::new(&schema);
        assert!(matches!(
            scope.resolve(&Column::new("id")),
            Err(PlanError::ColumnAmbiguous { .. })
        ));
        assert_eq!(scope.resolve(&Column::qualified("left", "id")).unwrap().index, 0);
    }

    #[test]
    fn test_join_condition_errors() {
        let ambiguous = JoinCondition::On(LogicalExpr::col("id").eq(LogicalExpr::col("user_id")));
        assert!(matches!(
            join_schema(&users(), &orders(), JoinType::Inner, &ambiguous),
            Err(PlanError::ColumnAmbiguous { .. })
        ));
        let not_bool = JoinCondition::On(LogicalExpr::col("users.age"));
        assert!(matches!(
            join_schema(&users(), &orders(), JoinType::Inner, &not_bool),
            Err(PlanError::TypeMismatch(_))
        ));
        assert!(matches!(
            join_schema(&users(), &orders(), JoinType::Inner, &JoinCondition::None),
            Err(PlanError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_join_using() {
        let left = Schema::new(vec![
            Field::not_null("k", DataType::Int),
            Field::nullable("a", DataType::Text),
        ])
        .with_qualifier("l");
        let right = Schema::new(vec![
            Field::not_null("b", DataType::Text),
            Field::not_null("k", DataType::BigInt),
        ])
        .with_qualifier("r");
        let using = JoinCondition::Using(vec!["k".to_string()]);

        let (schema, outputs) = join_schema(&left, &right, JoinType::Full, &using).unwrap();
        assert_eq!(schema.names(), vec!["k", "a", "b"]);
        assert_eq!(outputs[0], JoinColumn::Coalesce(0, 1));
        assert_eq!(schema.field(0).unwrap().data_type, DataType::BigInt);
        assert!(!schema.field(0).unwrap().nullable);
        assert!(schema.field(2).unwrap().nullable);

        let scope = Scope::new(&schema);
        assert_eq!(scope.resolve(&Column::new("k")).unwrap().index, 0);
        assert_eq!(scope.resolve(&Column::qualified("r", "k")).unwrap().index, 0);

        let (_, outputs) = join_schema(&left, &right, JoinType::Right, &using).unwrap();
        assert_eq!(outputs[0], JoinColumn::Right(1));
    }

    #[test]
    fn test_semi_join_exposes_left() {
        let condition = JoinCondition::On(
            LogicalExpr::col("users.id").eq(LogicalExpr::col("user_id")),
        );
        let (schema, outputs) =
            join_schema(&users(), &orders(), JoinType::Semi, &condition).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(outputs, vec![JoinColumn::Left(0), JoinColumn::Left(1), JoinColumn::Left(2)]);
    }

    #[test]
    fn test_aggregate_schema() {
        let schema = orders();
        let group_by = vec![LogicalExpr::col("user_id")];
        let aggregates = vec![
            LogicalExpr::call("sum", vec![LogicalExpr::col("amount")]).alias("total"),
            LogicalExpr::count_star(),
        ];
        let out = aggregate_schema(&schema, &group_by, &aggregates).unwrap();
        assert_eq!(out.names(), vec!["user_id", "total", "COUNT(*)"]);
        assert!(!out.field(2).unwrap().nullable);

        let ungrouped = vec![LogicalExpr::col("amount")];
        assert!(matches!(
            aggregate_schema(&schema, &group_by, &ungrouped),
            Err(PlanError::InvalidAggregation(_))
        ));

        let nested = vec![LogicalExpr::call(
            "sum",
            vec![LogicalExpr::call("max", vec![LogicalExpr::col("amount")])],
        )];
        assert!(matches!(
            aggregate_schema(&schema, &group_by, &nested),
            Err(PlanError::InvalidAggregation(_))
        ));

        let windowed = vec![LogicalExpr::call("rank", vec![]).over(WindowSpec::new())];
        assert!(matches!(
            aggregate_schema(&schema, &group_by, &windowed),
            Err(PlanError::InvalidAggregation(_))
        ));

        let grouped_expr = vec![LogicalExpr::col("user_id").add(LogicalExpr::lit_i64(1))];
        assert!(aggregate_schema(&schema, &group_by, &grouped_expr).is_ok());
    }

    #[test]
    fn test_set_operation_schema() {
        let a = Schema::new(vec![Field::not_null("x", DataType::Int)]);
        let b = Schema::new(vec![Field::nullable("y", DataType::BigInt)]);
        let out = set_operation_schema(&a, &b, SetOpType::Union).unwrap();
        assert_eq!(out.names(), vec!["x"]);
        assert_eq!(out.field(0).unwrap().data_type, DataType::BigInt);
        assert!(out.field(0).unwrap().nullable);

        let c = Schema::new(vec![
            Field::not_null("x", DataType::Int),
            Field::not_null("z", DataType::Int),
        ]);
        assert!(matches!(
            set_operation_schema(&a, &c, SetOpType::UnionAll),
            Err(PlanError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_values_schema() {
        let names = vec!["a".to_string(), "b".to_string()];
        let rows = vec![
            vec![LogicalExpr::lit_i64(1), LogicalExpr::lit_null()],
            vec![LogicalExpr::lit_f64(2.5), LogicalExpr::lit_str("x")],
        ];
        let out = values_schema(&names, &rows).unwrap();
        assert_eq!(out.field(0).unwrap().data_type, DataType::Double);
        assert!(!out.field(0).unwrap().nullable);
        assert_eq!(out.field(1).unwrap().data_type, DataType::Varchar(None));
        assert!(out.field(1).unwrap().nullable);

        let short = vec![vec![LogicalExpr::lit_i64(1)]];
        assert!(matches!(
            values_schema(&names, &short),
            Err(PlanError::TypeMismatch(_))
        ));
        let with_column = vec![vec![LogicalExpr::col("a"), LogicalExpr::lit_i64(1)]];
        assert!(matches!(
            values_schema(&names, &with_column),
            Err(PlanError::ColumnNotFound(_))
        ));
    }
}
