//! Logical plan wrapper and utilities.

use std::fmt;
use std::sync::Arc;

use quarry_common::EXPLAIN_INDENT;

use super::catalog::TableSource;
use super::expr::LogicalExpr;
use super::operator::{schema_summary, JoinCondition, LogicalOperator};
use super::schema::SchemaRef;

/// A logical query plan.
///
/// Cloning is cheap: plans share their operator tree.
#[derive(Debug, Clone)]
pub struct LogicalPlan {
    /// Root operator.
    pub root: Arc<LogicalOperator>,
}

impl LogicalPlan {
    /// Creates a new logical plan.
    pub fn new(root: LogicalOperator) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Creates from an Arc.
    pub fn from_arc(root: Arc<LogicalOperator>) -> Self {
        Self { root }
    }

    /// Returns the output schema.
    pub fn schema(&self) -> SchemaRef {
        self.root.schema()
    }

    /// Returns the height of the operator tree (a single scan is 1).
    pub fn depth(&self) -> usize {
        fn depth_of(op: &LogicalOperator) -> usize {
            1 + op.children().into_iter().map(|c| depth_of(c)).max().unwrap_or(0)
        }
        depth_of(&self.root)
    }

    /// Returns the number of operators in the tree.
    pub fn node_count(&self) -> usize {
        struct Counter(usize);
        impl PlanVisitor for Counter {
            fn pre_visit(&mut self, _op: &LogicalOperator) -> bool {
                self.0 += 1;
                true
            }
            fn post_visit(&mut self, _op: &LogicalOperator) {}
        }
        let mut counter = Counter(0);
        visit_plan(&self.root, &mut counter);
        counter.0
    }

    /// Returns a formatted string representation of the plan.
    pub fn display(&self) -> String {
        let mut output = String::new();
        self.format_node(&self.root, 0, &mut output);
        output
    }

    /// Returns a detailed formatted string for EXPLAIN.
    pub fn explain(&self) -> String {
        let mut output = String::new();
        self.explain_node(&self.root, 0, &mut output);
        output
    }

    fn format_node(&self, op: &LogicalOperator, indent: usize, output: &mut String) {
        let prefix = " ".repeat(indent * EXPLAIN_INDENT);
        output.push_str(&format!("{}{}\n", prefix, node_label(op)));
        for child in op.children() {
            self.format_node(child, indent + 1, output);
        }
    }

    fn explain_node(&self, op: &LogicalOperator, indent: usize, output: &mut String) {
        let prefix = " ".repeat(indent * EXPLAIN_INDENT);
        let detail = " ".repeat((indent + 1) * EXPLAIN_INDENT);
        let list = |output: &mut String, title: &str, exprs: &[LogicalExpr]| {
            output.push_str(&format!("{}{}:\n", detail, title));
            for expr in exprs {
                output.push_str(&format!("{}  - {}\n", detail, expr));
            }
        };

        output.push_str(&format!("{}{}:\n", prefix, op.name()));
        output.push_str(&format!("{}Schema: {}\n", detail, op.schema()));

        match op {
            LogicalOperator::Scan(scan) => {
                output.push_str(&format!("{}Table: {}\n", detail, scan.table.name));
                if let TableSource::Query(sql) = &scan.table.source {
                    output.push_str(&format!("{}Query: {}\n", detail, sql));
                }
                if let Some(proj) = &scan.projection {
                    output.push_str(&format!("{}Projection: {:?}\n", detail, proj));
                }
            }
            LogicalOperator::Projection(proj) => list(output, "Expressions", &proj.exprs),
            LogicalOperator::Filter(filter) => {
                output.push_str(&format!("{}Predicate: {}\n", detail, filter.predicate));
            }
            LogicalOperator::Join(join) => {
                output.push_str(&format!("{}Type: {}\n", detail, join.join_type));
                if join.condition != JoinCondition::None {
                    output.push_str(&format!("{}Condition: {}\n", detail, join.condition));
                }
            }
            LogicalOperator::Aggregate(agg) => {
                if !agg.group_by.is_empty() {
                    list(output, "Group By", &agg.group_by);
                }
                list(output, "Aggregates", &agg.aggregates);
            }
            LogicalOperator::Sort(sort) => {
                output.push_str(&format!("{}Order By:\n", detail));
                for key in &sort.order_by {
                    output.push_str(&format!("{}  - {}\n", detail, key));
                }
            }
            LogicalOperator::Limit(limit) => {
                output.push_str(&format!(
                    "{}Offset: {}, Fetch: {}\n",
                    detail,
                    limit.offset,
                    limit.fetch.map_or_else(|| "all".to_string(), |f| f.to_string())
                ));
            }
            LogicalOperator::SetOperation(setop) => {
                output.push_str(&format!("{}Operation: {}\n", detail, setop.op));
            }
            LogicalOperator::SubqueryAlias(alias) => {
                output.push_str(&format!("{}Alias: {}\n", detail, alias.alias));
            }
            LogicalOperator::Values(values) => {
                output.push_str(&format!("{}Rows: {}\n", detail, values.values.len()));
            }
            LogicalOperator::Distinct(_) | LogicalOperator::EmptyRelation(_) => {}
        }

        for child in op.children() {
            self.explain_node(child, indent + 1, output);
        }
    }
}

fn node_label(op: &LogicalOperator) -> String {
    match op {
        LogicalOperator::Scan(scan) => {
            let mut label = format!("Scan: {}", scan.table.name);
            if scan.projection.is_some() {
                label.push_str(&format!(" [{}]", schema_summary(&scan.projected_schema)));
            }
            label
        }
        LogicalOperator::Projection(proj) => format!("Projection: {}", join_exprs(&proj.exprs)),
        LogicalOperator::Filter(filter) => format!("Filter: {}", filter.predicate),
        LogicalOperator::Join(join) => match &join.condition {
            JoinCondition::None => format!("Join: {}", join.join_type),
            condition => format!("Join: {} {}", join.join_type, condition),
        },
        LogicalOperator::Aggregate(agg) => format!(
            "Aggregate: groups=[{}] aggs=[{}]",
            join_exprs(&agg.group_by),
            join_exprs(&agg.aggregates)
        ),
        LogicalOperator::Sort(sort) => {
            let keys: Vec<_> = sort.order_by.iter().map(ToString::to_string).collect();
            format!("Sort: {}", keys.join(", "))
        }
        LogicalOperator::Limit(limit) => match limit.fetch {
            Some(fetch) => format!("Limit: offset={} fetch={}", limit.offset, fetch),
            None => format!("Limit: offset={}", limit.offset),
        },
        LogicalOperator::Distinct(_) => "Distinct".to_string(),
        LogicalOperator::SetOperation(setop) => format!("SetOp: {}", setop.op),
        LogicalOperator::SubqueryAlias(alias) => format!("SubqueryAlias: {}", alias.alias),
        LogicalOperator::Values(values) => format!("Values: {} rows", values.values.len()),
        LogicalOperator::EmptyRelation(empty) => {
            format!("EmptyRelation: [{}]", schema_summary(&empty.schema))
        }
    }
}

fn join_exprs(exprs: &[LogicalExpr]) -> String {
    exprs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Visitor trait for traversing logical plans.
pub trait PlanVisitor {
    /// Called before visiting children.
    fn pre_visit(&mut self, op: &LogicalOperator) -> bool;
    /// Called after visiting children.
    fn post_visit(&mut self, op: &LogicalOperator);
}

/// Visit a logical plan tree.
pub fn visit_plan<V: PlanVisitor>(op: &LogicalOperator, visitor: &mut V) {
    if visitor.pre_visit(op) {
        for child in op.children() {
            visit_plan(child, visitor);
        }
    }
    visitor.post_visit(op);
}
