//! Lowering of logical operators into SELECT blocks.
//!
//! Operators are compiled bottom-up. Each returns a [`Block`]; a parent
//! folds its own clause into the child's block when SQL evaluation order
//! allows it, and otherwise closes the child off as a derived table with a
//! fresh alias. Derived tables expose `c0, c1, ...` so that names never
//! collide; only the outermost SELECT uses the schema's names.

use std::sync::Arc;

use quarry_common::{
    CompilerConfig, IdentifierQuoting, EMPTY_RELATION_PREDICATE, INTERNAL_COLUMN_PREFIX,
    LEFT_QUALIFIER, RIGHT_QUALIFIER,
};

use crate::logical::{
    extract_conjuncts, resolver, AggregateOperator, BinaryOp, Column, FilterOperator,
    JoinColumn, JoinCondition, JoinOperator, JoinType, LogicalExpr, LogicalOperator,
    LogicalPlan, ObjectName, ProjectionOperator, Schema, SetOpType, SetOperationOperator,
    SortOperator, TableSource, ValuesOperator,
};
use crate::types::DataType;

use super::dialect::{Dialect, LimitStyle};
use super::expr::{conjunction, prec, Columns, Fragment};
use super::params::ParamCollector;
use super::{CompileError, CompileResult};

/// One ORDER BY key: the expression and its direction/nulls suffix.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderKey {
    pub expr: String,
    pub suffix: String,
}

impl OrderKey {
    pub(crate) fn to_sql(&self) -> String {
        format!("{}{}", self.expr, self.suffix)
    }
}

/// A single SELECT under construction.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectBlock {
    from: Option<String>,
    /// One fragment per output field of the operator that produced the block.
    columns: Vec<Fragment>,
    filters: Vec<Fragment>,
    group_by: Vec<Fragment>,
    having: Vec<Fragment>,
    order_by: Vec<OrderKey>,
    offset: u64,
    fetch: Option<u64>,
    aggregated: bool,
    windowed: bool,
    projected: bool,
    distinct: bool,
    /// FROM is a single table or derived table.
    single_source: bool,
}

impl SelectBlock {
    fn has_limit(&self) -> bool {
        self.offset > 0 || self.fetch.is_some()
    }

    /// Nothing but FROM and WHERE; columns are source references.
    fn is_plain(&self) -> bool {
        self.from.is_some()
            && !self.projected
            && !self.aggregated
            && !self.windowed
            && !self.distinct
            && !self.has_limit()
    }

    fn orders_selected(&self) -> bool {
        self.order_by
            .iter()
            .all(|key| self.columns.iter().any(|c| c.text == key.expr))
    }
}

/// Compiled form of an operator.
#[derive(Debug, Clone)]
pub(crate) enum Block {
    Select(SelectBlock),
    SetOp {
        op: SetOpType,
        left: Box<Block>,
        right: Box<Block>,
    },
}

/// Output names used when rendering a block.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Naming<'a> {
    /// The statement's own result columns.
    Final(&'a Schema),
    /// `c0, c1, ...` for derived tables and subqueries.
    Internal,
}

impl Naming<'_> {
    fn name(&self, index: usize) -> CompileResult<String> {
        match self {
            Naming::Final(schema) => schema
                .field(index)
                .map(|f| f.name().to_string())
                .ok_or_else(|| {
                    CompileError::internal(format!("no output field at index {}", index))
                }),
            Naming::Internal => Ok(internal_name(index)),
        }
    }
}

fn internal_name(index: usize) -> String {
    format!("{INTERNAL_COLUMN_PREFIX}{index}")
}

fn child_path(path: &str, index: usize) -> String {
    format!("{path}/{index}")
}

/// State of one compilation pass.
pub(crate) struct Compilation<'a> {
    pub(crate) dialect: &'a dyn Dialect,
    pub(crate) config: &'a CompilerConfig,
    pub(crate) params: ParamCollector,
    /// Render literals as text even when parameterizing. Set while
    /// emitting grouping keys, which appear in both SELECT and GROUP BY and
    /// must match textually.
    pub(crate) inline_literals: bool,
    aliases: usize,
}

impl<'a> Compilation<'a> {
    pub(crate) fn new(dialect: &'a dyn Dialect, config: &'a CompilerConfig) -> Self {
        Self {
            dialect,
            config,
            params: ParamCollector::new(),
            inline_literals: false,
            aliases: 0,
        }
    }

    /// Quotes `name` per the configured policy.
    /// NUL cannot appear in an identifier; it also delimits parameter
    /// markers.
    pub(crate) fn ident(&self, name: &str) -> CompileResult<String> {
        if name.contains('\0') {
            return Err(CompileError::InvalidArgument(format!(
                "identifier {name:?} contains a NUL character"
            )));
        }
        Ok(match self.config.identifier_quoting {
            IdentifierQuoting::Always => self.dialect.quote(name),
            IdentifierQuoting::AsNeeded if self.dialect.needs_quotes(name) => {
                self.dialect.quote(name)
            }
            IdentifierQuoting::AsNeeded => name.to_string(),
        })
    }

    fn object_name(&self, name: &ObjectName) -> CompileResult<String> {
        let parts = name
            .parts()
            .iter()
            .map(|part| self.ident(part))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(parts.join("."))
    }

    fn next_alias(&mut self) -> String {
        let alias = format!("{}{}", self.config.alias_prefix, self.aliases);
        self.aliases += 1;
        alias
    }

    fn column_ref(&self, alias: &str, name: &str) -> CompileResult<Fragment> {
        Ok(Fragment::column(
            format!("{}.{}", self.ident(alias)?, self.ident(name)?),
            name,
        ))
    }

    /// Compiles a nested plan into a standalone SELECT.
    pub(crate) fn subquery(&mut self, plan: &LogicalPlan, path: &str) -> CompileResult<String> {
        let block = self.operator(&plan.root, &format!("{path}/subquery"))?;
        self.render(block, Naming::Internal)
    }

    /// Compiles `op`, attaching `path` to any error raised beneath it that
    /// does not carry one yet.
    pub(crate) fn operator(&mut self, op: &LogicalOperator, path: &str) -> CompileResult<Block> {
        self.lower(op, path).map_err(|e| e.at(path))
    }

    fn lower(&mut self, op: &LogicalOperator, path: &str) -> CompileResult<Block> {
        let block = match op {
            LogicalOperator::Scan(scan) => {
                let alias = self.next_alias();
                let from = match &scan.table.source {
                    TableSource::Table(name) => {
                        format!("{} AS {}", self.object_name(name)?, self.ident(&alias)?)
                    }
                    TableSource::Query(sql) if sql.contains('\0') => {
                        return Err(CompileError::InvalidArgument(
                            "query source contains a NUL character".to_string(),
                        ))
                    }
                    TableSource::Query(sql) => format!("({}) AS {}", sql, self.ident(&alias)?),
                };
                let columns = scan
                    .projected_schema
                    .fields()
                    .iter()
                    .map(|f| self.column_ref(&alias, f.name()))
                    .collect::<CompileResult<_>>()?;
                SelectBlock {
                    from: Some(from),
                    columns,
                    single_source: true,
                    ..SelectBlock::default()
                }
            }
            LogicalOperator::Projection(p) => self.projection(p, path)?,
            LogicalOperator::Filter(f) => self.filter(f, path)?,
            LogicalOperator::Sort(s) => self.sort(s, path)?,
            LogicalOperator::Limit(l) => {
                let mut block = self.input(&l.input, path, 0)?;
                if block.has_limit() {
                    block = self.wrap(block)?;
                }
                block.offset = l.offset;
                block.fetch = l.fetch;
                block
            }
            LogicalOperator::Distinct(d) => {
                let mut block = self.input(&d.input, path, 0)?;
                if block.has_limit() || !block.orders_selected() {
                    block = self.wrap(block)?;
                }
                block.distinct = true;
                block
            }
            LogicalOperator::Aggregate(a) => self.aggregate(a, path)?,
            LogicalOperator::Join(j) => self.join(j, path)?,
            LogicalOperator::SetOperation(s) => return self.set_operation(s, path),
            LogicalOperator::SubqueryAlias(a) => {
                return self.operator(&a.input, &child_path(path, 0))
            }
            LogicalOperator::Values(v) => self.values(v, path)?,
            LogicalOperator::EmptyRelation(e) => self.empty_relation(&e.schema)?,
        };
        Ok(Block::Select(block))
    }

    /// Compiles child `index` of the node at `path` as a SELECT.
    fn input(
        &mut self,
        input: &Arc<LogicalOperator>,
        path: &str,
        index: usize,
    ) -> CompileResult<SelectBlock> {
        let block = self.operator(input, &child_path(path, index))?;
        match block {
            Block::Select(select) => Ok(select),
            set_op => self.derive(set_op, input.schema().len()),
        }
    }

    fn wrap(&mut self, block: SelectBlock) -> CompileResult<SelectBlock> {
        let width = block.columns.len();
        self.derive(Block::Select(block), width)
    }

    /// Closes `block` off as a derived table.
    pub(crate) fn derive(&mut self, block: Block, width: usize) -> CompileResult<SelectBlock> {
        let inner = self.render(block, Naming::Internal)?;
        let alias = self.next_alias();
        let columns = (0..width)
            .map(|i| self.column_ref(&alias, &internal_name(i)))
            .collect::<CompileResult<_>>()?;
        Ok(SelectBlock {
            from: Some(format!("({}) AS {}", inner, self.ident(&alias)?)),
            columns,
            single_source: true,
            ..SelectBlock::default()
        })
    }

    fn exprs(
        &mut self,
        exprs: &[LogicalExpr],
        schema: &Schema,
        block: &SelectBlock,
        path: &str,
    ) -> CompileResult<Vec<Fragment>> {
        let columns = Columns::new(schema, &block.columns);
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            out.push(self.expr(expr, &columns, path)?);
        }
        Ok(out)
    }

    fn projection(&mut self, p: &ProjectionOperator, path: &str) -> CompileResult<SelectBlock> {
        let mut block = self.input(&p.input, path, 0)?;
        let windowed = p.exprs.iter().any(|e| e.contains_window());
        if block.has_limit() || block.distinct || (windowed && (block.windowed || block.aggregated))
        {
            block = self.wrap(block)?;
        }
        let columns = self.exprs(&p.exprs, &p.input.schema(), &block, path)?;
        block.columns = columns;
        block.projected = true;
        block.windowed |= windowed;
        Ok(block)
    }

    fn filter(&mut self, f: &FilterOperator, path: &str) -> CompileResult<SelectBlock> {
        let mut block = self.input(&f.input, path, 0)?;
        if block.has_limit() || block.windowed {
            block = self.wrap(block)?;
        }
        let schema = f.input.schema();
        let conjuncts: Vec<_> = extract_conjuncts(&f.predicate).into_iter().cloned().collect();
        let predicates = self.exprs(&conjuncts, &schema, &block, path)?;
        if block.aggregated {
            block.having.extend(predicates);
        } else {
            block.filters.extend(predicates);
        }
        Ok(block)
    }

    fn sort(&mut self, s: &SortOperator, path: &str) -> CompileResult<SelectBlock> {
        let mut block = self.input(&s.input, path, 0)?;
        if block.has_limit() {
            block = self.wrap(block)?;
        }
        let schema = s.input.schema();
        let mut keys = {
            let columns = Columns::new(&schema, &block.columns);
            self.sort_keys(&s.order_by, &columns, path)?
        };
        if block.distinct
            && !keys
                .iter()
                .all(|key| block.columns.iter().any(|c| c.text == key.expr))
        {
            block = self.wrap(block)?;
            let columns = Columns::new(&schema, &block.columns);
            keys = self.sort_keys(&s.order_by, &columns, path)?;
        }
        block.order_by = keys;
        Ok(block)
    }

    fn aggregate(&mut self, a: &AggregateOperator, path: &str) -> CompileResult<SelectBlock> {
        check_unique_names(&a.schema)?;
        let mut block = self.input(&a.input, path, 0)?;
        if !block.is_plain() {
            block = self.wrap(block)?;
        }
        block.order_by.clear();

        let schema = a.input.schema();
        self.inline_literals = true;
        let group_by = self.exprs(&a.group_by, &schema, &block, path);
        self.inline_literals = false;
        let group_by = group_by?;
        let aggregates = self.exprs(&a.aggregates, &schema, &block, path)?;
        block.columns = group_by.iter().cloned().chain(aggregates).collect();
        block.group_by = group_by;
        block.aggregated = true;
        Ok(block)
    }

    /// Returns `block` ready to appear directly in a FROM clause, wrapping
    /// it when it carries more than a source and hoistable filters.
    fn join_side(
        &mut self,
        block: SelectBlock,
        keep_filters: bool,
        single_source: bool,
    ) -> CompileResult<SelectBlock> {
        let direct = block.is_plain()
            && (keep_filters || block.filters.is_empty())
            && (block.single_source || !single_source);
        let mut block = if direct { block } else { self.wrap(block)? };
        block.order_by.clear();
        Ok(block)
    }

    fn join(&mut self, j: &JoinOperator, path: &str) -> CompileResult<SelectBlock> {
        if j.join_type == JoinType::Full && !self.dialect.features().full_outer_join {
            return Err(CompileError::unsupported(
                self.dialect.name(),
                "FULL OUTER JOIN",
            ));
        }
        if !j.join_type.is_semi_or_anti() {
            check_unique_names(&j.schema)?;
        }

        let left = self.input(&j.left, path, 0)?;
        let right = self.input(&j.right, path, 1)?;
        let left_filters = !matches!(j.join_type, JoinType::Right | JoinType::Full);
        let right_filters = !matches!(j.join_type, JoinType::Left | JoinType::Full);
        let left = self.join_side(left, left_filters, false)?;
        let right = self.join_side(right, right_filters, true)?;

        let left_schema = j.left.schema();
        let right_schema = j.right.schema();
        let left_q = left_schema.with_qualifier(LEFT_QUALIFIER);
        let right_q = right_schema.with_qualifier(RIGHT_QUALIFIER);

        if j.join_type.is_semi_or_anti() {
            let condition = match &j.condition {
                JoinCondition::On(expr) => {
                    let columns = Columns::new(&right_q, &right.columns)
                        .with_outer(&left_q, &left.columns);
                    self.expr(expr, &columns, path)?
                }
                JoinCondition::Using(keys) => {
                    self.using_condition(keys, &left_schema, &left, &right_schema, &right)?
                }
                JoinCondition::None => {
                    return Err(CompileError::internal("semi join without a condition"))
                }
            };
            let mut predicates = right.filters;
            predicates.push(condition);
            let from = right
                .from
                .ok_or_else(|| CompileError::internal("join side without a source"))?;
            let mut sql = format!("EXISTS (SELECT 1 FROM {}", from);
            if let Some(predicate) = conjunction(&predicates) {
                sql.push_str(&format!(" WHERE {}", predicate.text));
            }
            sql.push(')');
            let exists = if j.join_type == JoinType::Anti {
                Fragment::new(format!("NOT {}", sql), prec::NOT)
            } else {
                Fragment::atom(sql)
            };

            let mut block = left;
            block.filters.push(exists);
            return Ok(block);
        }

        let condition = match &j.condition {
            JoinCondition::On(expr) => {
                let namespace = resolver::join_namespace(&left_schema, &right_schema);
                let fragments: Vec<Fragment> =
                    left.columns.iter().chain(&right.columns).cloned().collect();
                let columns = Columns::new(&namespace, &fragments);
                Some(self.expr(expr, &columns, path)?)
            }
            JoinCondition::Using(keys) => Some(self.using_condition(
                keys,
                &left_schema,
                &left,
                &right_schema,
                &right,
            )?),
            JoinCondition::None => None,
        };

        let keyword = match j.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
            JoinType::Semi | JoinType::Anti => {
                return Err(CompileError::internal("semi join reached the FROM clause"))
            }
        };
        let (Some(left_from), Some(right_from)) = (&left.from, &right.from) else {
            return Err(CompileError::internal("join side without a source"));
        };
        let mut from = format!("{} {} {}", left_from, keyword, right_from);
        if let Some(condition) = condition {
            from.push_str(&format!(" ON {}", condition.text));
        }

        let mut columns = Vec::with_capacity(j.outputs.len());
        for output in &j.outputs {
            columns.push(match *output {
                JoinColumn::Left(i) => side_column(&left, i)?,
                JoinColumn::Right(i) => side_column(&right, i)?,
                JoinColumn::Coalesce(l, r) => Fragment::atom(format!(
                    "COALESCE({}, {})",
                    side_column(&left, l)?.text,
                    side_column(&right, r)?.text
                )),
            });
        }

        let mut filters = left.filters;
        filters.extend(right.filters);
        Ok(SelectBlock {
            from: Some(from),
            columns,
            filters,
            ..SelectBlock::default()
        })
    }

    fn using_condition(
        &mut self,
        keys: &[String],
        left_schema: &Schema,
        left: &SelectBlock,
        right_schema: &Schema,
        right: &SelectBlock,
    ) -> CompileResult<Fragment> {
        let mut equalities = Vec::with_capacity(keys.len());
        for key in keys {
            let reference = Column::new(key.as_str());
            let (Some(li), Some(ri)) = (
                left_schema.index_of_column(&reference),
                right_schema.index_of_column(&reference),
            ) else {
                return Err(CompileError::internal(format!(
                    "USING key {} not found on both sides",
                    key
                )));
            };
            let l = side_column(left, li)?;
            let r = side_column(right, ri)?;
            equalities.push(self.binary(&l, BinaryOp::Eq, &r));
        }
        conjunction(&equalities).ok_or_else(|| CompileError::internal("USING without keys"))
    }

    fn set_operation(&mut self, s: &SetOperationOperator, path: &str) -> CompileResult<Block> {
        let features = self.dialect.features();
        let supported = match s.op {
            SetOpType::IntersectAll => features.intersect_all,
            SetOpType::ExceptAll => features.except_all,
            _ => true,
        };
        if !supported {
            return Err(CompileError::unsupported(self.dialect.name(), s.op.to_string()));
        }

        let left = self.operator(&s.left, &child_path(path, 0))?;
        let right = self.operator(&s.right, &child_path(path, 1))?;
        let left = self.set_operand(left)?;
        let right = self.set_operand(right)?;
        Ok(Block::SetOp {
            op: s.op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Operands never carry ORDER BY; a limited operand is closed off first.
    fn set_operand(&mut self, block: Block) -> CompileResult<Block> {
        match block {
            Block::Select(select) if select.has_limit() => {
                Ok(Block::Select(self.wrap(select)?))
            }
            Block::Select(mut select) => {
                select.order_by.clear();
                Ok(Block::Select(select))
            }
            set_op => Ok(set_op),
        }
    }

    fn values(&mut self, v: &ValuesOperator, path: &str) -> CompileResult<SelectBlock> {
        if v.values.is_empty() {
            return self.empty_relation(&v.schema);
        }
        let none = Columns::none();
        let mut rows = Vec::with_capacity(v.values.len());
        for row in &v.values {
            let mut items = Vec::with_capacity(row.len());
            for (i, value) in row.iter().enumerate() {
                let data_type = v
                    .schema
                    .field(i)
                    .map(|f| &f.data_type)
                    .ok_or_else(|| CompileError::internal("VALUES row wider than its schema"))?;
                let text = if matches!(value.unalias(), LogicalExpr::Literal(lit) if lit.is_null()) {
                    self.null_of(data_type)?
                } else {
                    self.expr(value, &none, path)?.text
                };
                items.push(format!("{} AS {}", text, self.ident(&internal_name(i))?));
            }
            rows.push(format!("SELECT {}", items.join(", ")));
        }

        let alias = self.next_alias();
        let columns = (0..v.schema.len())
            .map(|i| self.column_ref(&alias, &internal_name(i)))
            .collect::<CompileResult<_>>()?;
        Ok(SelectBlock {
            from: Some(format!(
                "({}) AS {}",
                rows.join(" UNION ALL "),
                self.ident(&alias)?
            )),
            columns,
            single_source: true,
            ..SelectBlock::default()
        })
    }

    fn null_of(&self, data_type: &DataType) -> CompileResult<String> {
        if *data_type == DataType::Null {
            Ok("NULL".to_string())
        } else {
            Ok(format!("CAST(NULL AS {})", self.dialect.type_name(data_type)?))
        }
    }

    fn empty_relation(&mut self, schema: &Schema) -> CompileResult<SelectBlock> {
        let mut columns = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            columns.push(Fragment::atom(self.null_of(&field.data_type)?));
        }
        Ok(SelectBlock {
            columns,
            filters: vec![Fragment::new(EMPTY_RELATION_PREDICATE, prec::COMPARISON)],
            projected: true,
            ..SelectBlock::default()
        })
    }

    /// Renders a block as SQL text.
    pub(crate) fn render(&self, block: Block, naming: Naming<'_>) -> CompileResult<String> {
        match block {
            Block::Select(select) => self.render_select(select, naming),
            Block::SetOp { op, left, right } => {
                let left = self.render(*left, naming)?;
                let right = self.render(*right, Naming::Internal)?;
                Ok(format!("({}) {} ({})", left, op, right))
            }
        }
    }

    fn render_select(&self, block: SelectBlock, naming: Naming<'_>) -> CompileResult<String> {
        if block.columns.is_empty() {
            return Err(CompileError::internal("SELECT without columns"));
        }
        let limit_style = self.dialect.limit_style();
        let mut sql = String::from("SELECT ");
        if block.distinct {
            sql.push_str("DISTINCT ");
        }
        if limit_style == LimitStyle::Top && block.offset == 0 {
            if let Some(fetch) = block.fetch {
                sql.push_str(&format!("TOP {} ", fetch));
            }
        }

        let mut items = Vec::with_capacity(block.columns.len());
        for (i, column) in block.columns.iter().enumerate() {
            let name = naming.name(i)?;
            if column.name.as_deref() == Some(name.as_str()) {
                items.push(column.text.clone());
            } else {
                items.push(format!("{} AS {}", column.text, self.ident(&name)?));
            }
        }
        sql.push_str(&items.join(", "));

        match &block.from {
            Some(from) => sql.push_str(&format!(" FROM {}", from)),
            None if !block.filters.is_empty() && self.dialect.features().from_dual => {
                sql.push_str(" FROM DUAL")
            }
            None => {}
        }
        if let Some(predicate) = conjunction(&block.filters) {
            sql.push_str(&format!(" WHERE {}", predicate.text));
        }
        if !block.group_by.is_empty() {
            let keys: Vec<_> = block.group_by.iter().map(|g| g.text.as_str()).collect();
            sql.push_str(&format!(" GROUP BY {}", keys.join(", ")));
        }
        if let Some(predicate) = conjunction(&block.having) {
            sql.push_str(&format!(" HAVING {}", predicate.text));
        }

        let keep_order = matches!(naming, Naming::Final(_)) || block.has_limit();
        if keep_order && !block.order_by.is_empty() {
            let keys: Vec<_> = block.order_by.iter().map(OrderKey::to_sql).collect();
            sql.push_str(&format!(" ORDER BY {}", keys.join(", ")));
        }
        self.render_limit(&mut sql, &block, limit_style);
        Ok(sql)
    }

    fn render_limit(&self, sql: &mut String, block: &SelectBlock, style: LimitStyle) {
        if !block.has_limit() {
            return;
        }
        match style {
            LimitStyle::LimitOffset => {
                match (block.fetch, self.dialect.unbounded_limit()) {
                    (Some(fetch), _) => sql.push_str(&format!(" LIMIT {}", fetch)),
                    (None, Some(unbounded)) => sql.push_str(&format!(" LIMIT {}", unbounded)),
                    (None, None) => {}
                }
                if block.offset > 0 {
                    sql.push_str(&format!(" OFFSET {}", block.offset));
                }
            }
            LimitStyle::OffsetFetch => {
                if block.offset > 0 {
                    sql.push_str(&format!(" OFFSET {} ROWS", block.offset));
                }
                if let Some(fetch) = block.fetch {
                    sql.push_str(&format!(" FETCH FIRST {} ROWS ONLY", fetch));
                }
            }
            LimitStyle::Top => {
                if block.offset == 0 {
                    return;
                }
                if block.order_by.is_empty() {
                    sql.push_str(" ORDER BY (SELECT NULL)");
                }
                sql.push_str(&format!(" OFFSET {} ROWS", block.offset));
                if let Some(fetch) = block.fetch {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", fetch));
                }
            }
        }
    }
}

fn side_column(block: &SelectBlock, index: usize) -> CompileResult<Fragment> {
    block
        .columns
        .get(index)
        .cloned()
        .ok_or_else(|| CompileError::internal(format!("join side has no column {}", index)))
}

/// Aggregate and join outputs must not repeat a fully qualified name.
fn check_unique_names(schema: &Schema) -> CompileResult<()> {
    let fields = schema.fields();
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.column == field.column) {
            return Err(CompileError::DuplicateColumn {
                path: String::new(),
                name: field.qualified_name(),
            });
        }
    }
    Ok(())
}
