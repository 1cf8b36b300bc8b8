//! Scalar expression emission.
//!
//! Expressions are rendered against the column fragments of the block they
//! are placed in. Each fragment records how tightly it binds, and a child
//! is parenthesized exactly when it binds no tighter than its parent.

use crate::logical::{
    BinaryOp, Column, FunctionCall, LogicalExpr, PlanError, Schema, SortExpr, UnaryOp,
    WindowFrameUnits, WindowSpec,
};
use crate::types::Literal;

use super::query::{Compilation, OrderKey};
use super::{CompileError, CompileResult};

/// Binding strengths, loosest first.
pub(crate) mod prec {
    pub const OR: u8 = 1;
    pub const AND: u8 = 2;
    pub const NOT: u8 = 3;
    pub const COMPARISON: u8 = 4;
    pub const CONCAT: u8 = 5;
    pub const NEGATE: u8 = 8;
    pub const ATOM: u8 = 9;
}

/// A rendered piece of SQL.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub text: String,
    pub prec: u8,
    /// Bare column name when the fragment is a plain column reference.
    pub name: Option<String>,
}

impl Fragment {
    pub(crate) fn new(text: impl Into<String>, prec: u8) -> Self {
        Self {
            text: text.into(),
            prec,
            name: None,
        }
    }

    pub(crate) fn atom(text: impl Into<String>) -> Self {
        Self::new(text, prec::ATOM)
    }

    pub(crate) fn column(text: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prec: prec::ATOM,
            name: Some(name.into()),
        }
    }

    /// Text for use as an operand of an operator with precedence `parent`.
    pub(crate) fn operand(&self, parent: u8) -> String {
        if self.prec <= parent {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Joins predicates with `AND`.
pub(crate) fn conjunction(predicates: &[Fragment]) -> Option<Fragment> {
    match predicates {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(Fragment::new(
            many.iter()
                .map(|p| p.operand(prec::AND))
                .collect::<Vec<_>>()
                .join(" AND "),
            prec::AND,
        )),
    }
}

/// Column fragments visible to an expression, innermost level first.
#[derive(Debug, Clone)]
pub(crate) struct Columns<'a> {
    levels: Vec<(&'a Schema, &'a [Fragment])>,
}

impl<'a> Columns<'a> {
    pub(crate) fn new(schema: &'a Schema, fragments: &'a [Fragment]) -> Self {
        Self {
            levels: vec![(schema, fragments)],
        }
    }

    /// Adds an enclosing level, searched after the existing ones.
    pub(crate) fn with_outer(mut self, schema: &'a Schema, fragments: &'a [Fragment]) -> Self {
        self.levels.push((schema, fragments));
        self
    }

    /// Columns of a relation with no fields.
    pub(crate) fn none() -> Self {
        Self { levels: Vec::new() }
    }

    fn bind(&self, column: &Column) -> CompileResult<&'a Fragment> {
        for (schema, fragments) in &self.levels {
            match schema.matches(column).as_slice() {
                [] => continue,
                [index] => {
                    return fragments.get(*index).ok_or_else(|| {
                        CompileError::internal(format!(
                            "no fragment for column {} at index {}",
                            column, index
                        ))
                    })
                }
                many => {
                    return Err(PlanError::ColumnAmbiguous {
                        name: column.qualified_name(),
                        candidates: many
                            .iter()
                            .map(|i| schema.fields()[*i].qualified_name())
                            .collect(),
                    }
                    .into())
                }
            }
        }
        Err(PlanError::ColumnNotFound(column.qualified_name()).into())
    }
}

impl Compilation<'_> {
    /// Renders `expr`; aliases are dropped.
    pub(crate) fn expr(
        &mut self,
        expr: &LogicalExpr,
        columns: &Columns<'_>,
        path: &str,
    ) -> CompileResult<Fragment> {
        match expr {
            LogicalExpr::Column(c) => Ok(columns.bind(c)?.clone()),
            LogicalExpr::Literal(lit) => self.literal(lit).map_err(|e| e.at(path)),
            LogicalExpr::Alias { expr, .. } => self.expr(expr, columns, path),
            LogicalExpr::BinaryOp { left, op, right } => {
                let l = self.expr(left, columns, path)?;
                let r = self.expr(right, columns, path)?;
                Ok(self.binary(&l, *op, &r))
            }
            LogicalExpr::UnaryOp { op, expr } => {
                let inner = self.expr(expr, columns, path)?;
                Ok(match op {
                    UnaryOp::Not => {
                        Fragment::new(format!("NOT {}", inner.operand(prec::NOT)), prec::NOT)
                    }
                    UnaryOp::Negate => {
                        Fragment::new(format!("-{}", inner.operand(prec::NEGATE)), prec::NEGATE)
                    }
                })
            }
            LogicalExpr::IsNull(e) => {
                let inner = self.expr(e, columns, path)?;
                Ok(Fragment::new(
                    format!("{} IS NULL", inner.operand(prec::COMPARISON)),
                    prec::COMPARISON,
                ))
            }
            LogicalExpr::IsNotNull(e) => {
                let inner = self.expr(e, columns, path)?;
                Ok(Fragment::new(
                    format!("{} IS NOT NULL", inner.operand(prec::COMPARISON)),
                    prec::COMPARISON,
                ))
            }
            LogicalExpr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let e = self.expr(expr, columns, path)?;
                let lo = self.expr(low, columns, path)?;
                let hi = self.expr(high, columns, path)?;
                Ok(Fragment::new(
                    format!(
                        "{} {}BETWEEN {} AND {}",
                        e.operand(prec::COMPARISON),
                        if *negated { "NOT " } else { "" },
                        lo.operand(prec::COMPARISON),
                        hi.operand(prec::COMPARISON)
                    ),
                    prec::COMPARISON,
                ))
            }
            LogicalExpr::InList {
                expr,
                list,
                negated,
            } => {
                let e = self.expr(expr, columns, path)?;
                let items = self.expr_list(list, columns, path)?;
                Ok(Fragment::new(
                    format!(
                        "{} {}IN ({})",
                        e.operand(prec::COMPARISON),
                        if *negated { "NOT " } else { "" },
                        items
                    ),
                    prec::COMPARISON,
                ))
            }
            LogicalExpr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let e = self.expr(expr, columns, path)?;
                let sql = self.subquery(subquery, path)?;
                Ok(Fragment::new(
                    format!(
                        "{} {}IN ({})",
                        e.operand(prec::COMPARISON),
                        if *negated { "NOT " } else { "" },
                        sql
                    ),
                    prec::COMPARISON,
                ))
            }
            LogicalExpr::Case {
                operand,
                when_then,
                else_result,
            } => {
                let mut sql = String::from("CASE");
                if let Some(op) = operand {
                    sql.push(' ');
                    sql.push_str(&self.expr(op, columns, path)?.text);
                }
                for (when, then) in when_then {
                    let w = self.expr(when, columns, path)?;
                    let t = self.expr(then, columns, path)?;
                    sql.push_str(&format!(" WHEN {} THEN {}", w.text, t.text));
                }
                if let Some(e) = else_result {
                    sql.push_str(&format!(" ELSE {}", self.expr(e, columns, path)?.text));
                }
                sql.push_str(" END");
                Ok(Fragment::atom(sql))
            }
            LogicalExpr::Cast { expr, data_type } => {
                let inner = self.expr(expr, columns, path)?;
                let type_name = self.dialect.type_name(data_type).map_err(|e| e.at(path))?;
                Ok(Fragment::atom(format!("CAST({} AS {})", inner.text, type_name)))
            }
            LogicalExpr::Function(call) => self.function(call, columns, path),
            LogicalExpr::ScalarSubquery(plan) => {
                Ok(Fragment::atom(format!("({})", self.subquery(plan, path)?)))
            }
            LogicalExpr::Exists { subquery, negated } => {
                let sql = self.subquery(subquery, path)?;
                Ok(if *negated {
                    Fragment::new(format!("NOT EXISTS ({})", sql), prec::NOT)
                } else {
                    Fragment::atom(format!("EXISTS ({})", sql))
                })
            }
            LogicalExpr::Wildcard => Ok(Fragment::atom("*")),
        }
    }

    fn expr_list(
        &mut self,
        exprs: &[LogicalExpr],
        columns: &Columns<'_>,
        path: &str,
    ) -> CompileResult<String> {
        let mut parts = Vec::with_capacity(exprs.len());
        for expr in exprs {
            parts.push(self.expr(expr, columns, path)?.text);
        }
        Ok(parts.join(", "))
    }

    /// Combines two rendered operands.
    pub(crate) fn binary(&self, left: &Fragment, op: BinaryOp, right: &Fragment) -> Fragment {
        if op == BinaryOp::Concat && self.dialect.concat_operator().is_none() {
            return Fragment::atom(format!("CONCAT({}, {})", left.text, right.text));
        }
        let p = op.precedence();
        let symbol = match op {
            BinaryOp::Concat => self.dialect.concat_operator().unwrap_or("||").to_string(),
            other => other.to_string(),
        };
        Fragment::new(
            format!("{} {} {}", left.operand(p), symbol, right.operand(p)),
            p,
        )
    }

    fn literal(&mut self, literal: &Literal) -> CompileResult<Fragment> {
        if literal.is_null() {
            return Ok(Fragment::atom("NULL"));
        }
        if self.config.parameterize_literals && !self.inline_literals {
            return Ok(Fragment::atom(self.params.push(literal.clone())));
        }
        let text = self.dialect.literal(literal)?;
        Ok(if literal.is_negative() {
            Fragment::new(text, prec::NEGATE)
        } else {
            Fragment::atom(text)
        })
    }

    fn function(
        &mut self,
        call: &FunctionCall,
        columns: &Columns<'_>,
        path: &str,
    ) -> CompileResult<Fragment> {
        let signature = call.signature().ok_or_else(|| {
            CompileError::from(PlanError::UnknownFunction(call.name.clone())).at(path)
        })?;
        let name = self.dialect.function_name(signature.name).ok_or_else(|| {
            CompileError::unsupported(self.dialect.name(), format!("function {}", signature.name))
                .at(path)
        })?;

        let mut sql = if signature.niladic {
            name
        } else {
            let args = self.expr_list(&call.args, columns, path)?;
            if call.distinct {
                format!("{}(DISTINCT {})", name, args)
            } else {
                format!("{}({})", name, args)
            }
        };
        if let Some(window) = &call.window {
            sql.push_str(&format!(" OVER ({})", self.window(window, columns, path)?));
        }
        Ok(Fragment::atom(sql))
    }

    fn window(
        &mut self,
        window: &WindowSpec,
        columns: &Columns<'_>,
        path: &str,
    ) -> CompileResult<String> {
        let mut parts = Vec::new();
        if !window.partition_by.is_empty() {
            parts.push(format!(
                "PARTITION BY {}",
                self.expr_list(&window.partition_by, columns, path)?
            ));
        }
        if !window.order_by.is_empty() {
            let keys = self.sort_keys(&window.order_by, columns, path)?;
            parts.push(format!(
                "ORDER BY {}",
                keys.iter()
                    .map(OrderKey::to_sql)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if let Some(frame) = &window.frame {
            let features = self.dialect.features();
            if !features.window_frames {
                return Err(CompileError::unsupported(self.dialect.name(), "window frames").at(path));
            }
            if frame.units == WindowFrameUnits::Range
                && frame.has_offset()
                && !features.range_frame_offsets
            {
                return Err(CompileError::unsupported(
                    self.dialect.name(),
                    "RANGE frames with offsets",
                )
                .at(path));
            }
            parts.push(frame.to_string());
        }
        Ok(parts.join(" "))
    }

    /// Renders sort keys as `expr [DESC] [NULLS FIRST|LAST]`.
    pub(crate) fn sort_keys(
        &mut self,
        keys: &[SortExpr],
        columns: &Columns<'_>,
        path: &str,
    ) -> CompileResult<Vec<OrderKey>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let expr = self.expr(&key.expr, columns, path)?.text;
            let mut suffix = String::new();
            if !key.asc {
                suffix.push_str(" DESC");
            }
            if let Some(first) = key.nulls_first {
                if !self.dialect.features().nulls_ordering {
                    return Err(CompileError::unsupported(
                        self.dialect.name(),
                        "NULLS FIRST/LAST",
                    )
                    .at(path));
                }
                suffix.push_str(if first { " NULLS FIRST" } else { " NULLS LAST" });
            }
            out.push(OrderKey { expr, suffix });
        }
        Ok(out)
    }
}
