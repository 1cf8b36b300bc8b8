//! Logical expressions for query plans.
//!
//! Expressions are immutable trees built by cheap fluent constructors. Column
//! references stay unresolved symbols until the plan node that carries them
//! is built, at which point the resolver types them against the node's
//! input schema. The checked constructors [`LogicalExpr::try_binary`] and
//! [`LogicalExpr::function`] reject what can be rejected without a schema.

use std::fmt;
use std::sync::Arc;

use super::error::{PlanError, PlanResult};
use super::plan::LogicalPlan;
use super::resolver;
use super::schema::Column;
use crate::functions;
use crate::types::{DataType, Literal};

/// A logical expression.
///
/// Note: We implement PartialEq manually because subquery variants hold a
/// plan, which compares by identity.
#[derive(Debug, Clone)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum LogicalExpr {
    /// Column reference.
    Column(Column),

    /// Literal value.
    Literal(Literal),

    /// Alias (expression AS name).
    Alias {
        expr: Box<LogicalExpr>,
        name: String,
    },

    /// Binary operation.
    BinaryOp {
        left: Box<LogicalExpr>,
        op: BinaryOp,
        right: Box<LogicalExpr>,
    },

    /// Unary operation.
    UnaryOp { op: UnaryOp, expr: Box<LogicalExpr> },

    /// IS NULL check.
    IsNull(Box<LogicalExpr>),

    /// IS NOT NULL check.
    IsNotNull(Box<LogicalExpr>),

    /// BETWEEN expression.
    Between {
        expr: Box<LogicalExpr>,
        low: Box<LogicalExpr>,
        high: Box<LogicalExpr>,
        negated: bool,
    },

    /// IN list.
    InList {
        expr: Box<LogicalExpr>,
        list: Vec<LogicalExpr>,
        negated: bool,
    },

    /// IN subquery (uncorrelated, single column).
    InSubquery {
        expr: Box<LogicalExpr>,
        subquery: LogicalPlan,
        negated: bool,
    },

    /// CASE expression.
    Case {
        operand: Option<Box<LogicalExpr>>,
        when_then: Vec<(LogicalExpr, LogicalExpr)>,
        else_result: Option<Box<LogicalExpr>>,
    },

    /// CAST expression.
    Cast {
        expr: Box<LogicalExpr>,
        data_type: DataType,
    },

    /// Scalar, aggregate or window function call.
    Function(FunctionCall),

    /// Scalar subquery (returns single value).
    ScalarSubquery(LogicalPlan),

    /// EXISTS subquery.
    Exists {
        subquery: LogicalPlan,
        negated: bool,
    },

    /// Wildcard (*), only valid as the argument of COUNT.
    Wildcard,
}

impl PartialEq for LogicalExpr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Column(a), Self::Column(b)) => a == b,
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Alias { expr: e1, name: n1 }, Self::Alias { expr: e2, name: n2 }) => {
                e1 == e2 && n1 == n2
            }
            (
                Self::BinaryOp {
                    left: l1,
                    op: o1,
                    right: r1,
                },
                Self::BinaryOp {
                    left: l2,
                    op: o2,
                    right: r2,
                },
            ) => l1 == l2 && o1 == o2 && r1 == r2,
            (Self::UnaryOp { op: o1, expr: e1 }, Self::UnaryOp { op: o2, expr: e2 }) => {
                o1 == o2 && e1 == e2
            }
            (Self::IsNull(a), Self::IsNull(b)) => a == b,
            (Self::IsNotNull(a), Self::IsNotNull(b)) => a == b,
            (
                Self::Between {
                    expr: e1,
                    low: l1,
                    high: h1,
                    negated: n1,
                },
                Self::Between {
                    expr: e2,
                    low: l2,
                    high: h2,
                    negated: n2,
                },
            ) => e1 == e2 && l1 == l2 && h1 == h2 && n1 == n2,
            (
                Self::InList {
                    expr: e1,
                    list: l1,
                    negated: n1,
                },
                Self::InList {
                    expr: e2,
                    list: l2,
                    negated: n2,
                },
            ) => e1 == e2 && l1 == l2 && n1 == n2,
            (
                Self::InSubquery {
                    expr: e1,
                    subquery: s1,
                    negated: n1,
                },
                Self::InSubquery {
                    expr: e2,
                    subquery: s2,
                    negated: n2,
                },
            ) => e1 == e2 && Arc::ptr_eq(&s1.root, &s2.root) && n1 == n2,
            (
                Self::Case {
                    operand: o1,
                    when_then: w1,
                    else_result: e1,
                },
                Self::Case {
                    operand: o2,
                    when_then: w2,
                    else_result: e2,
                },
            ) => o1 == o2 && w1 == w2 && e1 == e2,
            (
                Self::Cast {
                    expr: e1,
                    data_type: d1,
                },
                Self::Cast {
                    expr: e2,
                    data_type: d2,
                },
            ) => e1 == e2 && d1 == d2,
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::ScalarSubquery(s1), Self::ScalarSubquery(s2)) => Arc::ptr_eq(&s1.root, &s2.root),
            (
                Self::Exists {
                    subquery: s1,
                    negated: n1,
                },
                Self::Exists {
                    subquery: s2,
                    negated: n2,
                },
            ) => Arc::ptr_eq(&s1.root, &s2.root) && n1 == n2,
            (Self::Wildcard, Self::Wildcard) => true,
            _ => false,
        }
    }
}

impl LogicalExpr {
    // ===== Constructors =====

    /// Creates a column reference from a possibly dotted name.
    pub fn col(name: &str) -> Self {
        LogicalExpr::Column(Column::from_qualified_name(name))
    }

    /// Creates a qualified column reference.
    pub fn qualified_col(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        LogicalExpr::Column(Column::qualified(qualifier, name))
    }

    /// Creates a literal.
    pub fn lit(value: impl Into<Literal>) -> Self {
        LogicalExpr::Literal(value.into())
    }

    /// Creates a literal integer.
    pub fn lit_i64(value: i64) -> Self {
        LogicalExpr::Literal(Literal::Integer(value))
    }

    /// Creates a literal float.
    pub fn lit_f64(value: f64) -> Self {
        LogicalExpr::Literal(Literal::Float(value))
    }

    /// Creates a literal string.
    pub fn lit_str(value: impl Into<String>) -> Self {
        LogicalExpr::Literal(Literal::String(value.into()))
    }

    /// Creates a literal boolean.
    pub fn lit_bool(value: bool) -> Self {
        LogicalExpr::Literal(Literal::Boolean(value))
    }

    /// Creates a NULL literal.
    pub fn lit_null() -> Self {
        LogicalExpr::Literal(Literal::Null)
    }

    /// Names the expression. Aliasing an alias keeps the innermost name.
    pub fn alias(self, name: impl Into<String>) -> Self {
        match self {
            alias @ LogicalExpr::Alias { .. } => alias,
            expr => LogicalExpr::Alias {
                expr: Box::new(expr),
                name: name.into(),
            },
        }
    }

    /// CAST(self AS data_type).
    pub fn cast(self, data_type: DataType) -> Self {
        LogicalExpr::Cast {
            expr: Box::new(self),
            data_type,
        }
    }

    /// Creates a CASE expression.
    pub fn case(
        operand: Option<LogicalExpr>,
        when_then: Vec<(LogicalExpr, LogicalExpr)>,
        else_result: Option<LogicalExpr>,
    ) -> Self {
        LogicalExpr::Case {
            operand: operand.map(Box::new),
            when_then,
            else_result: else_result.map(Box::new),
        }
    }

    /// Scalar subquery.
    pub fn scalar_subquery(plan: LogicalPlan) -> Self {
        LogicalExpr::ScalarSubquery(plan)
    }

    /// EXISTS (plan).
    pub fn exists(plan: LogicalPlan) -> Self {
        LogicalExpr::Exists {
            subquery: plan,
            negated: false,
        }
    }

    /// NOT EXISTS (plan).
    pub fn not_exists(plan: LogicalPlan) -> Self {
        LogicalExpr::Exists {
            subquery: plan,
            negated: true,
        }
    }

    // ===== Binary operations =====

    /// Equality comparison.
    pub fn eq(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Eq, other)
    }

    /// Not equal comparison.
    pub fn not_eq(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::NotEq, other)
    }

    /// Less than comparison.
    pub fn lt(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Lt, other)
    }

    /// Less than or equal comparison.
    pub fn lt_eq(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::LtEq, other)
    }

    /// Greater than comparison.
    pub fn gt(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Gt, other)
    }

    /// Greater than or equal comparison.
    pub fn gt_eq(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::GtEq, other)
    }

    /// Logical AND.
    pub fn and(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::And, other)
    }

    /// Logical OR.
    pub fn or(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Or, other)
    }

    /// Addition.
    pub fn add(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Plus, other)
    }

    /// Subtraction.
    pub fn sub(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Minus, other)
    }

    /// Multiplication.
    pub fn mul(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Multiply, other)
    }

    /// Division.
    pub fn div(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Divide, other)
    }

    /// Remainder.
    pub fn modulo(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Modulo, other)
    }

    /// LIKE pattern matching.
    pub fn like(self, pattern: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Like, pattern)
    }

    /// NOT LIKE pattern matching.
    pub fn not_like(self, pattern: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::NotLike, pattern)
    }

    /// String concatenation.
    pub fn concat(self, other: LogicalExpr) -> Self {
        self.binary_op(BinaryOp::Concat, other)
    }

    fn binary_op(self, op: BinaryOp, right: LogicalExpr) -> Self {
        LogicalExpr::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// Builds a binary operation, rejecting operand types that are known
    /// without a schema (literal-only subtrees) and cannot work.
    pub fn try_binary(left: LogicalExpr, op: BinaryOp, right: LogicalExpr) -> PlanResult<Self> {
        let left_type = left.static_type();
        let right_type = right.static_type();
        for t in [&left_type, &right_type].into_iter().flatten() {
            resolver::check_operand(op, t)?;
        }
        if let (Some(l), Some(r)) = (&left_type, &right_type) {
            resolver::binary_type(op, l, r)?;
        }
        Ok(left.binary_op(op, right))
    }

    // ===== Unary operations =====

    /// Logical NOT.
    pub fn not(self) -> Self {
        LogicalExpr::UnaryOp {
            op: UnaryOp::Not,
            expr: Box::new(self),
        }
    }

    /// Arithmetic negation.
    pub fn neg(self) -> Self {
        LogicalExpr::UnaryOp {
            op: UnaryOp::Negate,
            expr: Box::new(self),
        }
    }

    /// IS NULL.
    pub fn is_null(self) -> Self {
        LogicalExpr::IsNull(Box::new(self))
    }

    /// IS NOT NULL.
    pub fn is_not_null(self) -> Self {
        LogicalExpr::IsNotNull(Box::new(self))
    }

    /// self BETWEEN low AND high.
    pub fn between(self, low: LogicalExpr, high: LogicalExpr) -> Self {
        LogicalExpr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    /// self NOT BETWEEN low AND high.
    pub fn not_between(self, low: LogicalExpr, high: LogicalExpr) -> Self {
        LogicalExpr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: true,
        }
    }

    /// self IN (list).
    pub fn in_list(self, list: Vec<LogicalExpr>) -> Self {
        LogicalExpr::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    /// self NOT IN (list).
    pub fn not_in_list(self, list: Vec<LogicalExpr>) -> Self {
        LogicalExpr::InList {
            expr: Box::new(self),
            list,
            negated: true,
        }
    }

    /// self IN (subquery).
    pub fn in_subquery(self, subquery: LogicalPlan) -> Self {
        LogicalExpr::InSubquery {
            expr: Box::new(self),
            subquery,
            negated: false,
        }
    }

    /// self NOT IN (subquery).
    pub fn not_in_subquery(self, subquery: LogicalPlan) -> Self {
        LogicalExpr::InSubquery {
            expr: Box::new(self),
            subquery,
            negated: true,
        }
    }

    // ===== Functions =====

    /// Builds a call to a registered function, checking name and arity.
    pub fn function(name: &str, args: Vec<LogicalExpr>) -> PlanResult<Self> {
        let sig =
            functions::lookup(name).ok_or_else(|| PlanError::UnknownFunction(name.to_string()))?;
        if !sig.accepts(args.len()) {
            return Err(PlanError::invalid_argument(format!(
                "{} expects {} argument(s), got {}",
                sig.name,
                sig.arity(),
                args.len()
            )));
        }
        if sig.name != "count" && args.iter().any(|a| matches!(a, LogicalExpr::Wildcard)) {
            return Err(PlanError::invalid_argument(format!(
                "* is not a valid argument of {}",
                sig.name
            )));
        }
        Ok(Self::call(sig.name, args))
    }

    /// Builds a function call without validation; the resolver checks it
    /// when the carrying plan node is built.
    pub fn call(name: &str, args: Vec<LogicalExpr>) -> Self {
        let sig = functions::lookup(name);
        LogicalExpr::Function(FunctionCall {
            name: sig.map_or_else(|| name.to_lowercase(), |s| s.name.to_string()),
            args,
            is_aggregate: sig.map_or(false, |s| s.is_aggregate()),
            distinct: false,
            window: None,
        })
    }

    /// COUNT(*).
    pub fn count_star() -> Self {
        Self::call("count", vec![LogicalExpr::Wildcard])
    }

    /// Marks an aggregate call as DISTINCT. No effect on other expressions.
    pub fn distinct(self) -> Self {
        match self {
            LogicalExpr::Function(mut f) => {
                f.distinct = true;
                LogicalExpr::Function(f)
            }
            LogicalExpr::Alias { expr, name } => LogicalExpr::Alias {
                expr: Box::new(expr.distinct()),
                name,
            },
            other => other,
        }
    }

    /// Attaches a window specification.
    ///
    /// Applied to anything but a function call the result is a call with
    /// no name, which the resolver rejects.
    pub fn over(self, window: WindowSpec) -> Self {
        match self {
            LogicalExpr::Function(mut f) => {
                f.window = Some(window);
                LogicalExpr::Function(f)
            }
            LogicalExpr::Alias { expr, name } => LogicalExpr::Alias {
                expr: Box::new(expr.over(window)),
                name,
            },
            other => LogicalExpr::Function(FunctionCall {
                name: String::new(),
                args: vec![other],
                is_aggregate: false,
                distinct: false,
                window: Some(window),
            }),
        }
    }

    /// Ascending sort key.
    pub fn asc(self) -> SortExpr {
        SortExpr::asc(self)
    }

    /// Descending sort key.
    pub fn desc(self) -> SortExpr {
        SortExpr::desc(self)
    }

    // ===== Analysis methods =====

    /// Returns the direct sub-expressions (subquery plans excluded).
    pub fn children(&self) -> Vec<&LogicalExpr> {
        match self {
            LogicalExpr::Column(_)
            | LogicalExpr::Literal(_)
            | LogicalExpr::Wildcard
            | LogicalExpr::ScalarSubquery(_)
            | LogicalExpr::Exists { .. } => vec![],
            LogicalExpr::Alias { expr, .. }
            | LogicalExpr::UnaryOp { expr, .. }
            | LogicalExpr::Cast { expr, .. }
            | LogicalExpr::InSubquery { expr, .. } => vec![expr.as_ref()],
            LogicalExpr::IsNull(e) | LogicalExpr::IsNotNull(e) => vec![e.as_ref()],
            LogicalExpr::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            LogicalExpr::Between {
                expr, low, high, ..
            } => vec![expr.as_ref(), low.as_ref(), high.as_ref()],
            LogicalExpr::InList { expr, list, .. } => {
                let mut children = vec![expr.as_ref()];
                children.extend(list.iter());
                children
            }
            LogicalExpr::Case {
                operand,
                when_then,
                else_result,
            } => {
                let mut children = Vec::new();
                if let Some(op) = operand {
                    children.push(op.as_ref());
                }
                for (w, t) in when_then {
                    children.push(w);
                    children.push(t);
                }
                if let Some(e) = else_result {
                    children.push(e.as_ref());
                }
                children
            }
            LogicalExpr::Function(f) => {
                let mut children: Vec<&LogicalExpr> = f.args.iter().collect();
                if let Some(window) = &f.window {
                    children.extend(window.partition_by.iter());
                    children.extend(window.order_by.iter().map(|s| &s.expr));
                }
                children
            }
        }
    }

    /// Returns true if `pred` holds for this node or any descendant.
    pub fn exists_node(&self, pred: &impl Fn(&LogicalExpr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.exists_node(pred))
    }

    /// Returns all column references in this expression, in first-seen order.
    pub fn columns(&self) -> Vec<Column> {
        let mut cols = Vec::new();
        self.collect_columns(&mut cols);
        cols
    }

    fn collect_columns(&self, cols: &mut Vec<Column>) {
        if let LogicalExpr::Column(c) = self {
            if !cols.contains(c) {
                cols.push(c.clone());
            }
        }
        for child in self.children() {
            child.collect_columns(cols);
        }
    }

    /// Returns true for an aggregate call without an OVER clause.
    pub fn is_aggregate_call(&self) -> bool {
        matches!(self, LogicalExpr::Function(f) if f.is_aggregate && f.window.is_none())
    }

    /// Returns true for a call with an OVER clause.
    pub fn is_window_call(&self) -> bool {
        matches!(self, LogicalExpr::Function(f) if f.window.is_some())
    }

    /// Returns true if this expression contains any aggregate call.
    pub fn contains_aggregate(&self) -> bool {
        self.exists_node(&LogicalExpr::is_aggregate_call)
    }

    /// Returns true if this expression contains any window call.
    pub fn contains_window(&self) -> bool {
        self.exists_node(&LogicalExpr::is_window_call)
    }

    /// Returns true if this expression contains a subquery.
    pub fn contains_subquery(&self) -> bool {
        self.exists_node(&|e: &LogicalExpr| {
            matches!(
                e,
                LogicalExpr::ScalarSubquery(_)
                    | LogicalExpr::Exists { .. }
                    | LogicalExpr::InSubquery { .. }
            )
        })
    }

    /// Strips a top-level alias.
    pub fn unalias(&self) -> &LogicalExpr {
        match self {
            LogicalExpr::Alias { expr, .. } => expr.unalias(),
            other => other,
        }
    }

    /// Returns the type of a context-free expression, or `None` when it
    /// depends on a schema.
    pub fn static_type(&self) -> Option<DataType> {
        match self {
            LogicalExpr::Literal(lit) => Some(lit.data_type()),
            LogicalExpr::Cast { data_type, .. } => Some(data_type.clone()),
            LogicalExpr::Alias { expr, .. } => expr.static_type(),
            LogicalExpr::BinaryOp { left, op, right } => {
                resolver::binary_type(*op, &left.static_type()?, &right.static_type()?).ok()
            }
            LogicalExpr::UnaryOp {
                op: UnaryOp::Not, ..
            } => Some(DataType::Boolean),
            LogicalExpr::UnaryOp {
                op: UnaryOp::Negate,
                expr,
            } => expr.static_type(),
            LogicalExpr::IsNull(_)
            | LogicalExpr::IsNotNull(_)
            | LogicalExpr::Between { .. }
            | LogicalExpr::InList { .. }
            | LogicalExpr::InSubquery { .. }
            | LogicalExpr::Exists { .. } => Some(DataType::Boolean),
            _ => None,
        }
    }

    /// Returns the output name of this expression: the alias, the column
    /// name, or the canonical rendering (`SUM(amount)`, `(a + b)`).
    pub fn output_name(&self) -> String {
        match self {
            LogicalExpr::Alias { name, .. } => name.clone(),
            LogicalExpr::Column(col) => col.name.clone(),
            other => other.to_string(),
        }
    }

    // ===== Rewriting =====

    /// Rewrites the tree bottom-up: children first, then `f` on the node.
    pub fn transform_up<E, F>(self, f: &mut F) -> Result<LogicalExpr, E>
    where
        F: FnMut(LogicalExpr) -> Result<LogicalExpr, E>,
    {
        let rebuilt = self.map_children(&mut |child: LogicalExpr| child.transform_up(f))?;
        f(rebuilt)
    }

    /// Applies `g` to every direct child, rebuilding the node.
    pub fn map_children<E, G>(self, g: &mut G) -> Result<LogicalExpr, E>
    where
        G: FnMut(LogicalExpr) -> Result<LogicalExpr, E>,
    {
        let expr = match self {
            leaf @ (LogicalExpr::Column(_)
            | LogicalExpr::Literal(_)
            | LogicalExpr::Wildcard
            | LogicalExpr::ScalarSubquery(_)
            | LogicalExpr::Exists { .. }) => leaf,
            LogicalExpr::Alias { expr, name } => LogicalExpr::Alias {
                expr: map_box(expr, g)?,
                name,
            },
            LogicalExpr::BinaryOp { left, op, right } => {
                let left = map_box(left, g)?;
                let right = map_box(right, g)?;
                LogicalExpr::BinaryOp { left, op, right }
            }
            LogicalExpr::UnaryOp { op, expr } => LogicalExpr::UnaryOp {
                op,
                expr: map_box(expr, g)?,
            },
            LogicalExpr::IsNull(e) => LogicalExpr::IsNull(map_box(e, g)?),
            LogicalExpr::IsNotNull(e) => LogicalExpr::IsNotNull(map_box(e, g)?),
            LogicalExpr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let expr = map_box(expr, g)?;
                let low = map_box(low, g)?;
                let high = map_box(high, g)?;
                LogicalExpr::Between {
                    expr,
                    low,
                    high,
                    negated,
                }
            }
            LogicalExpr::InList {
                expr,
                list,
                negated,
            } => {
                let expr = map_box(expr, g)?;
                let list = map_vec(list, g)?;
                LogicalExpr::InList {
                    expr,
                    list,
                    negated,
                }
            }
            LogicalExpr::InSubquery {
                expr,
                subquery,
                negated,
            } => LogicalExpr::InSubquery {
                expr: map_box(expr, g)?,
                subquery,
                negated,
            },
            LogicalExpr::Case {
                operand,
                when_then,
                else_result,
            } => {
                let operand = match operand {
                    Some(op) => Some(map_box(op, g)?),
                    None => None,
                };
                let mut pairs = Vec::with_capacity(when_then.len());
                for (w, t) in when_then {
                    let w = g(w)?;
                    let t = g(t)?;
                    pairs.push((w, t));
                }
                let else_result = match else_result {
                    Some(e) => Some(map_box(e, g)?),
                    None => None,
                };
                LogicalExpr::Case {
                    operand,
                    when_then: pairs,
                    else_result,
                }
            }
            LogicalExpr::Cast { expr, data_type } => LogicalExpr::Cast {
                expr: map_box(expr, g)?,
                data_type,
            },
            LogicalExpr::Function(call) => {
                let args = map_vec(call.args, g)?;
                let window = match call.window {
                    Some(window) => {
                        let partition_by = map_vec(window.partition_by, g)?;
                        let mut order_by = Vec::with_capacity(window.order_by.len());
                        for sort in window.order_by {
                            order_by.push(SortExpr {
                                expr: g(sort.expr)?,
                                ..sort
                            });
                        }
                        Some(WindowSpec {
                            partition_by,
                            order_by,
                            frame: window.frame,
                        })
                    }
                    None => None,
                };
                LogicalExpr::Function(FunctionCall {
                    args,
                    window,
                    ..call
                })
            }
        };
        Ok(expr)
    }
}

fn map_box<E, G>(expr: Box<LogicalExpr>, g: &mut G) -> Result<Box<LogicalExpr>, E>
where
    G: FnMut(LogicalExpr) -> Result<LogicalExpr, E>,
{
    Ok(Box::new(g(*expr)?))
}

fn map_vec<E, G>(exprs: Vec<LogicalExpr>, g: &mut G) -> Result<Vec<LogicalExpr>, E>
where
    G: FnMut(LogicalExpr) -> Result<LogicalExpr, E>,
{
    let mut out = Vec::with_capacity(exprs.len());
    for expr in exprs {
        out.push(g(expr)?);
    }
    Ok(out)
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for LogicalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalExpr::Column(col) => write!(f, "{}", col),
            LogicalExpr::Literal(lit) => write!(f, "{}", lit),
            LogicalExpr::Alias { expr, name } => write!(f, "{} AS {}", expr, name),
            LogicalExpr::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            LogicalExpr::UnaryOp { op, expr } => match op {
                UnaryOp::Not => write!(f, "NOT {}", expr),
                UnaryOp::Negate => write!(f, "-{}", expr),
            },
            LogicalExpr::IsNull(e) => write!(f, "{} IS NULL", e),
            LogicalExpr::IsNotNull(e) => write!(f, "{} IS NOT NULL", e),
            LogicalExpr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                expr,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
            LogicalExpr::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{} {}IN (", expr, if *negated { "NOT " } else { "" })?;
                write_list(f, list)?;
                write!(f, ")")
            }
            LogicalExpr::InSubquery { expr, negated, .. } => write!(
                f,
                "{} {}IN (<subquery>)",
                expr,
                if *negated { "NOT " } else { "" }
            ),
            LogicalExpr::Case {
                operand,
                when_then,
                else_result,
            } => {
                write!(f, "CASE")?;
                if let Some(op) = operand {
                    write!(f, " {}", op)?;
                }
                for (w, t) in when_then {
                    write!(f, " WHEN {} THEN {}", w, t)?;
                }
                if let Some(e) = else_result {
                    write!(f, " ELSE {}", e)?;
                }
                write!(f, " END")
            }
            LogicalExpr::Cast { expr, data_type } => write!(f, "CAST({} AS {})", expr, data_type),
            LogicalExpr::Function(call) => write!(f, "{}", call),
            LogicalExpr::ScalarSubquery(_) => write!(f, "(<subquery>)"),
            LogicalExpr::Exists { negated, .. } => {
                write!(f, "{}EXISTS (<subquery>)", if *negated { "NOT " } else { "" })
            }
            LogicalExpr::Wildcard => write!(f, "*"),
        }
    }
}

/// A function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Logical (registry) name, lower case.
    pub name: String,
    /// Arguments.
    pub args: Vec<LogicalExpr>,
    /// Registered as an aggregate.
    pub is_aggregate: bool,
    /// DISTINCT modifier (aggregates only).
    pub distinct: bool,
    /// OVER clause.
    pub window: Option<WindowSpec>,
}

impl FunctionCall {
    /// Returns the registry entry for this call.
    pub fn signature(&self) -> Option<&'static functions::FunctionSignature> {
        functions::lookup(&self.name)
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name.to_uppercase())?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_list(f, &self.args)?;
        write!(f, ")")?;
        if let Some(window) = &self.window {
            write!(f, " OVER ({})", window)?;
        }
        Ok(())
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Comparison
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,

    // Arithmetic
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,

    // Logical
    /// `AND`
    And,
    /// `OR`
    Or,

    // String
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// String concatenation (`||` or `CONCAT`).
    Concat,
}

impl BinaryOp {
    /// Returns true if this is a comparison operator.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// Returns true if this is a logical operator.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Returns true if this is an arithmetic operator.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Plus
                | BinaryOp::Minus
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
        )
    }

    /// Binding strength used when emitting SQL (higher binds tighter).
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
            | BinaryOp::Like
            | BinaryOp::NotLike => 4,
            BinaryOp::Concat => 5,
            BinaryOp::Plus | BinaryOp::Minus => 6,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 7,
        }
    }

    /// Returns the negation of this comparison operator.
    pub fn negate(&self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Eq => Some(BinaryOp::NotEq),
            BinaryOp::NotEq => Some(BinaryOp::Eq),
            BinaryOp::Lt => Some(BinaryOp::GtEq),
            BinaryOp::LtEq => Some(BinaryOp::Gt),
            BinaryOp::Gt => Some(BinaryOp::LtEq),
            BinaryOp::GtEq => Some(BinaryOp::Lt),
            BinaryOp::Like => Some(BinaryOp::NotLike),
            BinaryOp::NotLike => Some(BinaryOp::Like),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Eq => write!(f, "="),
            BinaryOp::NotEq => write!(f, "<>"),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::LtEq => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::GtEq => write!(f, ">="),
            BinaryOp::Plus => write!(f, "+"),
            BinaryOp::Minus => write!(f, "-"),
            BinaryOp::Multiply => write!(f, "*"),
            BinaryOp::Divide => write!(f, "/"),
            BinaryOp::Modulo => write!(f, "%"),
            BinaryOp::And => write!(f, "AND"),
            BinaryOp::Or => write!(f, "OR"),
            BinaryOp::Like => write!(f, "LIKE"),
            BinaryOp::NotLike => write!(f, "NOT LIKE"),
            BinaryOp::Concat => write!(f, "||"),
        }
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `NOT`
    Not,
    /// Arithmetic negation.
    Negate,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "NOT"),
            UnaryOp::Negate => write!(f, "-"),
        }
    }
}

/// Sort expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    /// Expression to sort by.
    pub expr: LogicalExpr,
    /// Sort direction.
    pub asc: bool,
    /// Explicit NULL placement; `None` leaves the engine default.
    pub nulls_first: Option<bool>,
}

impl SortExpr {
    /// Creates a new ascending sort.
    pub fn asc(expr: LogicalExpr) -> Self {
        Self {
            expr,
            asc: true,
            nulls_first: None,
        }
    }

    /// Creates a new descending sort.
    pub fn desc(expr: LogicalExpr) -> Self {
        Self {
            expr,
            asc: false,
            nulls_first: None,
        }
    }

    /// Places NULLs first.
    pub fn nulls_first(mut self) -> Self {
        self.nulls_first = Some(true);
        self
    }

    /// Places NULLs last.
    pub fn nulls_last(mut self) -> Self {
        self.nulls_first = Some(false);
        self
    }
}

impl fmt::Display for SortExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.asc {
            write!(f, " ASC")?;
        } else {
            write!(f, " DESC")?;
        }
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST"),
            Some(false) => write!(f, " NULLS LAST"),
            None => Ok(()),
        }
    }
}

/// OVER clause of a window function call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSpec {
    /// PARTITION BY expressions.
    pub partition_by: Vec<LogicalExpr>,
    /// ORDER BY keys.
    pub order_by: Vec<SortExpr>,
    /// Optional frame.
    pub frame: Option<WindowFrame>,
}

impl WindowSpec {
    /// Creates an empty window (`OVER ()`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the partition expressions.
    pub fn partition_by(mut self, exprs: Vec<LogicalExpr>) -> Self {
        self.partition_by = exprs;
        self
    }

    /// Sets the ordering.
    pub fn order_by(mut self, keys: Vec<SortExpr>) -> Self {
        self.order_by = keys;
        self
    }

    /// ROWS BETWEEN start AND end.
    pub fn rows_between(mut self, start: WindowFrameBound, end: WindowFrameBound) -> Self {
        self.frame = Some(WindowFrame {
            units: WindowFrameUnits::Rows,
            start,
            end,
        });
        self
    }

    /// RANGE BETWEEN start AND end.
    pub fn range_between(mut self, start: WindowFrameBound, end: WindowFrameBound) -> Self {
        self.frame = Some(WindowFrame {
            units: WindowFrameUnits::Range,
            start,
            end,
        });
        self
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            let exprs: Vec<_> = self.partition_by.iter().map(|e| e.to_string()).collect();
            parts.push(format!("PARTITION BY {}", exprs.join(", ")));
        }
        if !self.order_by.is_empty() {
            let keys: Vec<_> = self.order_by.iter().map(|s| s.to_string()).collect();
            parts.push(format!("ORDER BY {}", keys.join(", ")));
        }
        if let Some(frame) = &self.frame {
            parts.push(frame.to_string());
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Window frame specification.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    /// ROWS or RANGE.
    pub units: WindowFrameUnits,
    /// Start bound.
    pub start: WindowFrameBound,
    /// End bound.
    pub end: WindowFrameBound,
}

impl WindowFrame {
    /// Returns true if the start bound does not come after the end bound.
    pub fn is_well_ordered(&self) -> bool {
        self.start.position() <= self.end.position()
            && self.start != WindowFrameBound::UnboundedFollowing
            && self.end != WindowFrameBound::UnboundedPreceding
    }

    /// Returns true if either bound has a numeric offset.
    pub fn has_offset(&self) -> bool {
        self.start.offset().is_some() || self.end.offset().is_some()
    }
}

impl fmt::Display for WindowFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BETWEEN {} AND {}", self.units, self.start, self.end)
    }
}

/// Window frame units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFrameUnits {
    /// Physical row offsets.
    Rows,
    /// Offsets over the ordering value.
    Range,
}

impl fmt::Display for WindowFrameUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowFrameUnits::Rows => write!(f, "ROWS"),
            WindowFrameUnits::Range => write!(f, "RANGE"),
        }
    }
}

/// Window frame bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFrameBound {
    /// `UNBOUNDED PRECEDING`
    UnboundedPreceding,
    /// `n PRECEDING`
    Preceding(u64),
    /// `CURRENT ROW`
    CurrentRow,
    /// `n FOLLOWING`
    Following(u64),
    /// `UNBOUNDED FOLLOWING`
    UnboundedFollowing,
}

impl WindowFrameBound {
    fn position(&self) -> i128 {
        match self {
            WindowFrameBound::UnboundedPreceding => i128::MIN,
            WindowFrameBound::Preceding(n) => -i128::from(*n),
            WindowFrameBound::CurrentRow => 0,
            WindowFrameBound::Following(n) => i128::from(*n),
            WindowFrameBound::UnboundedFollowing => i128::MAX,
        }
    }

    /// Returns the numeric offset, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            WindowFrameBound::Preceding(n) | WindowFrameBound::Following(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for WindowFrameBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowFrameBound::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            WindowFrameBound::Preceding(n) => write!(f, "{} PRECEDING", n),
            WindowFrameBound::CurrentRow => write!(f, "CURRENT ROW"),
            WindowFrameBound::Following(n) => write!(f, "{} FOLLOWING", n),
            WindowFrameBound::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
        }
    }
}
