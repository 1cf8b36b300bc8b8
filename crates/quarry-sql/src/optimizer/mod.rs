//! Query optimizer for quarry.
//!
//! This module implements a rule-based optimizer that rewrites a finished
//! logical plan before it is compiled. Rules run in a fixed order, pass
//! after pass, until a pass changes nothing or the iteration bound is hit.
//!
//! # Optimization Rules
//!
//! - **ProjectionPruning**: drops columns no ancestor references
//! - **PredicateSimplification**: folds boolean literals in filters
//! - **ProjectionMerge**: collapses stacked renaming projections
//!
//! Every rule is a pure tree-to-tree transform that never increases depth
//! and never changes the root's output schema.
//!
//! # Example
//!
//! ```ignore
//! use quarry_sql::optimizer::{Optimizer, OptimizerConfig};
//!
//! let optimizer = Optimizer::new(OptimizerConfig::default());
//! let optimized_plan = optimizer.optimize(plan)?;
//! ```

mod rules;

pub use rules::*;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use quarry_common::{ErrorCode, OptimizerSettings};
use thiserror::Error;
use tracing::debug;

use crate::logical::{LogicalOperator, LogicalPlan, PlanError};

/// Errors that can occur during optimization.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Rule application failed.
    #[error("Rule '{rule}' failed: {message}")]
    RuleFailed {
        /// Rule name.
        rule: String,
        /// Error message.
        message: String,
    },

    /// A rewritten node failed validation.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Internal optimizer error.
    #[error("Internal optimizer error: {0}")]
    Internal(String),
}

impl OptimizerError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Plan(e) => e.code(),
            Self::RuleFailed { .. } | Self::Internal(_) => ErrorCode::Optimizer,
        }
    }
}

/// Result type for optimizer operations.
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Configuration for the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Maximum number of passes; `None` means plan depth + 1.
    pub max_iterations: Option<usize>,
    /// Whether to enable projection pruning.
    pub enable_projection_pruning: bool,
    /// Whether to enable predicate simplification.
    pub enable_predicate_simplification: bool,
    /// Whether to enable projection merging.
    pub enable_projection_merge: bool,
    /// Whether to collect optimization statistics.
    pub collect_stats: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            enable_projection_pruning: true,
            enable_predicate_simplification: true,
            enable_projection_merge: true,
            collect_stats: false,
        }
    }
}

impl OptimizerConfig {
    /// Creates a minimal config with all optimizations disabled.
    pub fn minimal() -> Self {
        Self {
            max_iterations: Some(1),
            enable_projection_pruning: false,
            enable_predicate_simplification: false,
            enable_projection_merge: false,
            collect_stats: false,
        }
    }

    /// Creates a config with all optimizations enabled.
    pub fn full() -> Self {
        Self::default()
    }
}

impl From<&OptimizerSettings> for OptimizerConfig {
    fn from(settings: &OptimizerSettings) -> Self {
        if !settings.enabled {
            return Self::minimal();
        }
        Self {
            max_iterations: settings.max_iterations,
            enable_projection_pruning: settings.projection_pruning,
            enable_predicate_simplification: settings.predicate_simplification,
            enable_projection_merge: settings.projection_merge,
            collect_stats: false,
        }
    }
}

/// Trait for optimizer rules.
///
/// Rules must be idempotent: applying a rule to its own output changes
/// nothing.
pub trait OptimizerRule: std::fmt::Debug + Send + Sync {
    /// Returns the name of this rule.
    fn name(&self) -> &str;

    /// Attempts to optimize the given plan.
    ///
    /// Returns the optimized plan if any transformation was made,
    /// or None if the plan was not modified.
    fn optimize(&self, plan: &LogicalPlan) -> OptimizerResult<Option<LogicalPlan>>;
}

/// Statistics about optimization.
#[derive(Debug, Clone, Default)]
pub struct OptimizationStats {
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of rules applied.
    pub rules_applied: usize,
    /// Per-rule application counts, sorted by rule name.
    pub rule_applications: Vec<(String, usize)>,
    /// Total optimization time in microseconds.
    pub total_time_us: u64,
}

/// The query optimizer.
#[derive(Debug)]
pub struct Optimizer {
    config: OptimizerConfig,
    rules: Vec<Arc<dyn OptimizerRule>>,
}

impl Optimizer {
    /// Creates a new optimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Self {
        let mut rules: Vec<Arc<dyn OptimizerRule>> = Vec::new();

        // Add rules in order of application
        if config.enable_projection_pruning {
            rules.push(Arc::new(ProjectionPruningRule));
        }
        if config.enable_predicate_simplification {
            rules.push(Arc::new(PredicateSimplificationRule));
        }
        if config.enable_projection_merge {
            rules.push(Arc::new(ProjectionMergeRule));
        }

        Self { config, rules }
    }

    /// Creates an optimizer with default configuration.
    pub fn default_optimizer() -> Self {
        Self::new(OptimizerConfig::default())
    }

    /// Optimizes a logical plan.
    pub fn optimize(&self, plan: LogicalPlan) -> OptimizerResult<LogicalPlan> {
        let (optimized, _) = self.optimize_with_stats(plan)?;
        Ok(optimized)
    }

    /// Optimizes a logical plan and returns optimization statistics.
    pub fn optimize_with_stats(
        &self,
        plan: LogicalPlan,
    ) -> OptimizerResult<(LogicalPlan, OptimizationStats)> {
        let start = Instant::now();
        let mut stats = OptimizationStats::default();
        let mut rule_counts: BTreeMap<String, usize> = BTreeMap::new();

        let max_iterations = self
            .config
            .max_iterations
            .unwrap_or_else(|| plan.depth() + 1);
        let mut current_plan = plan;

        for iteration in 0..max_iterations {
            stats.iterations = iteration + 1;
            let mut plan_changed = false;

            for rule in &self.rules {
                if let Some(new_plan) = rule.optimize(&current_plan)? {
                    debug!(
                        rule = rule.name(),
                        iteration,
                        nodes = new_plan.node_count(),
                        "optimizer rule applied"
                    );
                    current_plan = new_plan;
                    plan_changed = true;
                    stats.rules_applied += 1;
                    *rule_counts.entry(rule.name().to_string()).or_insert(0) += 1;
                }
            }

            if !plan_changed {
                break;
            }
        }

        stats.rule_applications = rule_counts.into_iter().collect();
        stats.total_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        if self.config.collect_stats {
            debug!(
                iterations = stats.iterations,
                rules_applied = stats.rules_applied,
                time_us = stats.total_time_us,
                "optimization finished"
            );
        }

        Ok((current_plan, stats))
    }

    /// Adds a custom optimization rule.
    pub fn add_rule(&mut self, rule: Arc<dyn OptimizerRule>) {
        self.rules.push(rule);
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

/// Rewrites an operator tree bottom-up: children first, then `f` on the
/// (possibly rebuilt) node. Returns `None` when nothing changed, so
/// untouched subtrees stay shared.
pub fn transform_up<F>(
    op: &Arc<LogicalOperator>,
    f: &mut F,
) -> OptimizerResult<Option<Arc<LogicalOperator>>>
where
    F: FnMut(&Arc<LogicalOperator>) -> OptimizerResult<Option<Arc<LogicalOperator>>>,
{
    let mut changed = false;
    let mut inputs = Vec::new();
    for child in op.children() {
        match transform_up(child, f)? {
            Some(new_child) => {
                changed = true;
                inputs.push(new_child);
            }
            None => inputs.push(child.clone()),
        }
    }

    let node = if changed {
        Arc::new(op.with_new_inputs(inputs)?)
    } else {
        op.clone()
    };
    match f(&node)? {
        Some(rewritten) => Ok(Some(rewritten)),
        None if changed => Ok(Some(node)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::{Field, LogicalExpr, LogicalPlanBuilder, Schema, TableMeta};
    use crate::types::DataType;

    fn users() -> LogicalPlanBuilder {
        LogicalPlanBuilder::scan_table(TableMeta::new(
            "users",
            Schema::new(vec![
                Field::not_null("id", DataType::Int),
                Field::nullable("name", DataType::Varchar(Some(255))),
                Field::nullable("age", DataType::Int),
            ]),
        ))
    }

    #[test]
    fn test_optimizer_config_default() {
        let config = OptimizerConfig::default();
        assert_eq!(config.max_iterations, None);
        assert!(config.enable_projection_pruning);
        assert!(config.enable_projection_merge);
    }

    #[test]
    fn test_optimizer_config_from_settings() {
        let settings = OptimizerSettings {
            projection_merge: false,
            max_iterations: Some(3),
            ..OptimizerSettings::default()
        };
        let config = OptimizerConfig::from(&settings);
        assert!(!config.enable_projection_merge);
        assert_eq!(config.max_iterations, Some(3));

        let disabled = OptimizerSettings {
            enabled: false,
            ..OptimizerSettings::default()
        };
        assert_eq!(OptimizerConfig::from(&disabled), OptimizerConfig::minimal());
    }

    #[test]
    fn test_optimizer_creation() {
        assert_eq!(Optimizer::new(OptimizerConfig::default()).rules.len(), 3);
        assert!(Optimizer::new(OptimizerConfig::minimal()).rules.is_empty());
    }

    #[test]
    fn test_optimizer_no_op() {
        let optimizer = Optimizer::default_optimizer();
        let plan = users().build();
        let (optimized, stats) = optimizer.optimize_with_stats(plan).unwrap();
        assert!(matches!(optimized.root.as_ref(), LogicalOperator::Scan(_)));
        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.rules_applied, 0);
    }

    #[test]
    fn test_optimizer_keeps_root_schema() {
        let plan = users()
            .filter(LogicalExpr::lit_bool(true).and(LogicalExpr::col("age").gt(LogicalExpr::lit_i64(1))))
            .unwrap()
            .project(vec![LogicalExpr::col("id"), LogicalExpr::col("name").alias("n")])
            .unwrap()
            .project(vec![LogicalExpr::col("n")])
            .unwrap()
            .build();
        let before = plan.schema();

        let (optimized, stats) = Optimizer::default_optimizer()
            .optimize_with_stats(plan)
            .unwrap();
        assert_eq!(optimized.schema().as_ref(), before.as_ref());
        assert!(stats.rules_applied >= 2);
        assert!(stats
            .rule_applications
            .iter()
            .any(|(name, _)| name == "ProjectionMerge"));
    }

    #[test]
    fn test_iteration_bound() {
        let config = OptimizerConfig {
            max_iterations: Some(1),
            ..OptimizerConfig::default()
        };
        let plan = users()
            .project(vec![LogicalExpr::col("id"), LogicalExpr::col("age")])
            .unwrap()
            .project(vec![LogicalExpr::col("id")])
            .unwrap()
            .build();
        let (_, stats) = Optimizer::new(config).optimize_with_stats(plan).unwrap();
        assert_eq!(stats.iterations, 1);
    }
}
