//! Optimization rules for the query optimizer.
//!
//! This module contains the individual optimization rules that transform
//! logical plans into simpler, equivalent forms.

use std::collections::BTreeSet;
use std::sync::Arc;

use quarry_common::{LEFT_QUALIFIER, RIGHT_QUALIFIER};

use crate::logical::resolver::{join_namespace, Scope};
use crate::logical::{
    BinaryOp, Column, EmptyRelationOperator, FilterOperator, JoinColumn, JoinCondition,
    JoinOperator, LogicalExpr, LogicalOperator, LogicalPlan, PlanError, ProjectionOperator,
    Schema, UnaryOp,
};
use crate::types::Literal;

use super::{transform_up, OptimizerResult, OptimizerRule};

// ============================================================================
// Projection Pruning Rule
// ============================================================================

/// Drops columns no ancestor references from intermediate projections and
/// scans.
///
/// Required columns are tracked top-down as field indices of each node's
/// output. The root requires every column, so its schema never changes.
///
/// # Example
///
/// Before:
/// ```text
/// Projection: name
///   Projection: id, name, age
///     Scan: users
/// ```
///
/// After:
/// ```text
/// Projection: name
///   Projection: name
///     Scan: users [users.name]
/// ```
#[derive(Debug)]
pub struct ProjectionPruningRule;

impl OptimizerRule for ProjectionPruningRule {
    fn name(&self) -> &str {
        "ProjectionPruning"
    }

    fn optimize(&self, plan: &LogicalPlan) -> OptimizerResult<Option<LogicalPlan>> {
        let required: BTreeSet<usize> = (0..plan.schema().len()).collect();
        let new_root = self.prune(&plan.root, &required)?;
        Ok(new_root.map(LogicalPlan::from_arc))
    }
}

type Required = BTreeSet<usize>;

impl ProjectionPruningRule {
    fn prune(
        &self,
        op: &Arc<LogicalOperator>,
        required: &Required,
    ) -> OptimizerResult<Option<Arc<LogicalOperator>>> {
        match op.as_ref() {
            LogicalOperator::Scan(scan) => {
                let width = scan.projected_schema.len();
                let keep = keep_indices(required, width);
                if keep.len() == width {
                    return Ok(None);
                }
                Ok(Some(Arc::new(LogicalOperator::Scan(
                    scan.with_projection(&keep)?,
                ))))
            }

            LogicalOperator::Projection(proj) => {
                let keep = keep_indices(required, proj.exprs.len());
                let exprs: Vec<LogicalExpr> =
                    keep.iter().map(|&i| proj.exprs[i].clone()).collect();
                let input_schema = proj.input.schema();
                let needed = referenced(&input_schema, exprs.iter())?;
                let new_input = self.prune(&proj.input, &needed)?;

                if keep.len() == proj.exprs.len() && new_input.is_none() {
                    return Ok(None);
                }
                let input = new_input.unwrap_or_else(|| proj.input.clone());
                Ok(Some(Arc::new(LogicalOperator::Projection(
                    ProjectionOperator::try_new(input, exprs)?,
                ))))
            }

            LogicalOperator::Filter(filter) => {
                let mut needed = required.clone();
                needed.extend(referenced(
                    &filter.input.schema(),
                    std::iter::once(&filter.predicate),
                )?);
                self.rebuild(op, vec![needed])
            }

            LogicalOperator::Sort(sort) => {
                let mut needed = required.clone();
                needed.extend(referenced(
                    &sort.input.schema(),
                    sort.order_by.iter().map(|k| &k.expr),
                )?);
                self.rebuild(op, vec![needed])
            }

            LogicalOperator::Limit(_) | LogicalOperator::SubqueryAlias(_) => {
                self.rebuild(op, vec![required.clone()])
            }

            LogicalOperator::Aggregate(agg) => {
                let needed = referenced(&agg.input.schema(), agg.output_exprs())?;
                self.rebuild(op, vec![needed])
            }

            LogicalOperator::Join(join) => {
                let (left, right) = join_required(join, required)?;
                self.rebuild(op, vec![left, right])
            }

            // Row identity depends on every column.
            LogicalOperator::Distinct(_) | LogicalOperator::SetOperation(_) => {
                let all = op
                    .children()
                    .into_iter()
                    .map(|child| (0..child.schema().len()).collect::<Required>())
                    .collect();
                self.rebuild(op, all)
            }

            LogicalOperator::Values(_) | LogicalOperator::EmptyRelation(_) => Ok(None),
        }
    }

    /// Prunes each child with its requirement and rebuilds `op` if any
    /// child changed.
    fn rebuild(
        &self,
        op: &Arc<LogicalOperator>,
        requirements: Vec<Required>,
    ) -> OptimizerResult<Option<Arc<LogicalOperator>>> {
        let mut changed = false;
        let mut inputs = Vec::with_capacity(requirements.len());
        for (child, needed) in op.children().into_iter().zip(&requirements) {
            match self.prune(child, needed)? {
                Some(new_child) => {
                    changed = true;
                    inputs.push(new_child);
                }
                None => inputs.push(child.clone()),
            }
        }
        if !changed {
            return Ok(None);
        }
        Ok(Some(Arc::new(op.with_new_inputs(inputs)?)))
    }
}

/// Sorted indices to keep; never empty for a non-empty relation.
fn keep_indices(required: &Required, width: usize) -> Vec<usize> {
    let keep: Vec<usize> = required.iter().copied().filter(|&i| i < width).collect();
    if keep.is_empty() && width > 0 {
        vec![0]
    } else {
        keep
    }
}

/// Input field indices referenced by `exprs`.
fn referenced<'a>(
    schema: &Schema,
    exprs: impl Iterator<Item = &'a LogicalExpr>,
) -> OptimizerResult<Required> {
    let scope = Scope::new(schema);
    let mut indices = Required::new();
    for expr in exprs {
        for column in expr.columns() {
            indices.insert(scope.resolve(&column)?.index);
        }
    }
    Ok(indices)
}

fn join_required(join: &JoinOperator, required: &Required) -> OptimizerResult<(Required, Required)> {
    let left_schema = join.left.schema();
    let right_schema = join.right.schema();
    let mut left = Required::new();
    let mut right = Required::new();

    for &i in required {
        match join.outputs.get(i) {
            Some(JoinColumn::Left(l)) => {
                left.insert(*l);
            }
            Some(JoinColumn::Right(r)) => {
                right.insert(*r);
            }
            Some(JoinColumn::Coalesce(l, r)) => {
                left.insert(*l);
                right.insert(*r);
            }
            None => {}
        }
    }

    match &join.condition {
        JoinCondition::On(expr) if join.join_type.is_semi_or_anti() => {
            let left_q = left_schema.with_qualifier(LEFT_QUALIFIER);
            let right_q = right_schema.with_qualifier(RIGHT_QUALIFIER);
            let outer = Scope::new(&left_q);
            let scope = Scope::with_parent(&right_q, &outer);
            for column in expr.columns() {
                let resolved = scope.resolve(&column)?;
                if resolved.depth == 0 {
                    right.insert(resolved.index);
                } else {
                    left.insert(resolved.index);
                }
            }
        }
        JoinCondition::On(expr) => {
            let namespace = join_namespace(&left_schema, &right_schema);
            let split = left_schema.len();
            for index in referenced(&namespace, std::iter::once(expr))? {
                if index < split {
                    left.insert(index);
                } else {
                    right.insert(index - split);
                }
            }
        }
        JoinCondition::Using(keys) => {
            for key in keys {
                let column = Column::new(key.clone());
                let l = left_schema.index_of_column(&column);
                let r = right_schema.index_of_column(&column);
                match (l, r) {
                    (Some(l), Some(r)) => {
                        left.insert(l);
                        right.insert(r);
                    }
                    _ => return Err(PlanError::ColumnNotFound(key.clone()).into()),
                }
            }
        }
        JoinCondition::None => {}
    }
    Ok((left, right))
}

// ============================================================================
// Predicate Simplification Rule
// ============================================================================

/// Folds boolean literals in filter predicates.
///
/// # Simplifications
///
/// - `true AND x` → `x`, `false AND x` → `false`
/// - `true OR x` → `true`, `false OR x` → `x`
/// - `NOT true` → `false`, `NOT NOT x` → `x`
/// - comparisons between literals → `true`/`false`
/// - `literal IS [NOT] NULL` → `true`/`false`
///
/// A filter folding to `true` is dropped. One folding to `false` (or
/// `NULL`) becomes an empty relation with the same schema.
#[derive(Debug)]
pub struct PredicateSimplificationRule;

impl OptimizerRule for PredicateSimplificationRule {
    fn name(&self) -> &str {
        "PredicateSimplification"
    }

    fn optimize(&self, plan: &LogicalPlan) -> OptimizerResult<Option<LogicalPlan>> {
        let new_root = transform_up(&plan.root, &mut |op| self.simplify(op))?;
        Ok(new_root.map(LogicalPlan::from_arc))
    }
}

impl PredicateSimplificationRule {
    fn simplify(
        &self,
        op: &Arc<LogicalOperator>,
    ) -> OptimizerResult<Option<Arc<LogicalOperator>>> {
        let LogicalOperator::Filter(filter) = op.as_ref() else {
            return Ok(None);
        };
        let simplified = simplify_predicate(&filter.predicate)?;

        match &simplified {
            LogicalExpr::Literal(Literal::Boolean(true)) => Ok(Some(filter.input.clone())),
            LogicalExpr::Literal(Literal::Boolean(false) | Literal::Null) => {
                Ok(Some(Arc::new(LogicalOperator::EmptyRelation(
                    EmptyRelationOperator::new(filter.input.schema()),
                ))))
            }
            _ if simplified == filter.predicate => Ok(None),
            _ => Ok(Some(Arc::new(LogicalOperator::Filter(
                FilterOperator::try_new(filter.input.clone(), simplified)?,
            )))),
        }
    }
}

/// Folds a predicate bottom-up.
pub fn simplify_predicate(predicate: &LogicalExpr) -> OptimizerResult<LogicalExpr> {
    let folded = predicate
        .clone()
        .transform_up(&mut |e| Ok::<_, PlanError>(fold_node(e)))?;
    Ok(folded)
}

fn fold_node(expr: LogicalExpr) -> LogicalExpr {
    match expr {
        LogicalExpr::BinaryOp {
            left,
            op: BinaryOp::And,
            right,
        } => match (bool_literal(&left), bool_literal(&right)) {
            (Some(true), _) => *right,
            (_, Some(true)) => *left,
            (Some(false), _) | (_, Some(false)) => LogicalExpr::lit_bool(false),
            _ => LogicalExpr::BinaryOp {
                left,
                op: BinaryOp::And,
                right,
            },
        },
        LogicalExpr::BinaryOp {
            left,
            op: BinaryOp::Or,
            right,
        } => match (bool_literal(&left), bool_literal(&right)) {
            (Some(true), _) | (_, Some(true)) => LogicalExpr::lit_bool(true),
            (Some(false), _) => *right,
            (_, Some(false)) => *left,
            _ => LogicalExpr::BinaryOp {
                left,
                op: BinaryOp::Or,
                right,
            },
        },
        LogicalExpr::BinaryOp { left, op, right } if op.is_comparison() => {
            match (left.as_ref(), right.as_ref()) {
                (LogicalExpr::Literal(l), LogicalExpr::Literal(r)) => match compare_literals(l, op, r) {
                    Some(folded) => LogicalExpr::Literal(folded),
                    None => LogicalExpr::BinaryOp { left, op, right },
                },
                _ => LogicalExpr::BinaryOp { left, op, right },
            }
        }
        LogicalExpr::UnaryOp {
            op: UnaryOp::Not,
            expr,
        } => match *expr {
            LogicalExpr::Literal(Literal::Boolean(b)) => LogicalExpr::lit_bool(!b),
            LogicalExpr::UnaryOp {
                op: UnaryOp::Not,
                expr: inner,
            } => *inner,
            other => other.not(),
        },
        LogicalExpr::IsNull(inner) => match inner.as_ref() {
            LogicalExpr::Literal(lit) => LogicalExpr::lit_bool(lit.is_null()),
            _ => LogicalExpr::IsNull(inner),
        },
        LogicalExpr::IsNotNull(inner) => match inner.as_ref() {
            LogicalExpr::Literal(lit) => LogicalExpr::lit_bool(!lit.is_null()),
            _ => LogicalExpr::IsNotNull(inner),
        },
        other => other,
    }
}

fn bool_literal(expr: &LogicalExpr) -> Option<bool> {
    match expr {
        LogicalExpr::Literal(Literal::Boolean(b)) => Some(*b),
        _ => None,
    }
}

/// Compares two literals; `NULL` on either side yields `NULL`. Strings are
/// left to the engine, whose collation decides case and trailing-space
/// equality.
fn compare_literals(left: &Literal, op: BinaryOp, right: &Literal) -> Option<Literal> {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Literal::Null, _) | (_, Literal::Null) => return Some(Literal::Null),
        (Literal::Integer(a), Literal::Integer(b)) => a.cmp(b),
        (Literal::Float(a), Literal::Float(b)) => a.partial_cmp(b)?,
        (Literal::Integer(a), Literal::Float(b)) => (*a as f64).partial_cmp(b)?,
        (Literal::Float(a), Literal::Integer(b)) => a.partial_cmp(&(*b as f64))?,
        (Literal::Boolean(a), Literal::Boolean(b)) => a.cmp(b),
        _ => return None,
    };
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => return None,
    };
    Some(Literal::Boolean(result))
}

// ============================================================================
// Projection Merge Rule
// ============================================================================

/// Collapses a projection over a projection when the outer one only
/// references, renames or reorders the inner one's columns, and drops
/// projections that reproduce their input unchanged.
///
/// # Example
///
/// Before:
/// ```text
/// Projection: b AS c
///   Projection: (a + 1) AS b
///     Scan: t
/// ```
///
/// After:
/// ```text
/// Projection: (a + 1) AS c
///   Scan: t
/// ```
#[derive(Debug)]
pub struct ProjectionMergeRule;

impl OptimizerRule for ProjectionMergeRule {
    fn name(&self) -> &str {
        "ProjectionMerge"
    }

    fn optimize(&self, plan: &LogicalPlan) -> OptimizerResult<Option<LogicalPlan>> {
        let new_root = transform_up(&plan.root, &mut |op| self.merge(op))?;
        Ok(new_root.map(LogicalPlan::from_arc))
    }
}

impl ProjectionMergeRule {
    fn merge(&self, op: &Arc<LogicalOperator>) -> OptimizerResult<Option<Arc<LogicalOperator>>> {
        let LogicalOperator::Projection(outer) = op.as_ref() else {
            return Ok(None);
        };

        if is_identity(outer) {
            return Ok(Some(outer.input.clone()));
        }

        let LogicalOperator::Projection(inner) = outer.input.as_ref() else {
            return Ok(None);
        };
        let inner_schema = inner.schema.clone();
        let scope = Scope::new(&inner_schema);
        let mut merged = Vec::with_capacity(outer.exprs.len());
        for expr in &outer.exprs {
            let (column, rename) = match expr {
                LogicalExpr::Column(c) => (c, None),
                LogicalExpr::Alias { expr, name } => match expr.as_ref() {
                    LogicalExpr::Column(c) => (c, Some(name)),
                    _ => return Ok(None),
                },
                _ => return Ok(None),
            };
            let source = &inner.exprs[scope.resolve(column)?.index];
            merged.push(match rename {
                Some(name) => source.unalias().clone().alias(name.clone()),
                None => source.clone(),
            });
        }

        Ok(Some(Arc::new(LogicalOperator::Projection(
            ProjectionOperator::try_new(inner.input.clone(), merged)?,
        ))))
    }
}

/// A projection of bare columns whose schema equals its input's.
fn is_identity(proj: &ProjectionOperator) -> bool {
    proj.exprs
        .iter()
        .all(|e| matches!(e, LogicalExpr::Column(_)))
        && proj.schema.as_ref() == proj.input.schema().as_ref()
}
