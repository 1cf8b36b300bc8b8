//! Table metadata and the catalog interface used by scans.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::schema::{Schema, SchemaRef};

/// A possibly schema-qualified object name (`db.schema.table`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName(pub Vec<String>);

impl ObjectName {
    /// Splits a dotted name into its parts.
    pub fn parse(name: &str) -> Self {
        Self(name.split('.').map(str::to_string).collect())
    }

    /// Returns the name parts, outermost first.
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Returns the last part, used to qualify scanned fields.
    pub fn short_name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Where the rows of a catalog entry come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// A named table or view.
    Table(ObjectName),
    /// An opaque SQL query, emitted verbatim as a derived table.
    Query(String),
}

/// Table metadata for planning.
#[derive(Debug, Clone)]
pub struct TableMeta {
    /// Catalog lookup name.
    pub name: ObjectName,
    /// Row source.
    pub source: TableSource,
    /// Table schema (unqualified fields).
    pub schema: SchemaRef,
}

impl TableMeta {
    /// Creates metadata for a named table.
    pub fn new(name: &str, schema: Schema) -> Self {
        let name = ObjectName::parse(name);
        Self {
            source: TableSource::Table(name.clone()),
            name,
            schema: Arc::new(schema),
        }
    }

    /// Creates metadata for a named SQL query.
    pub fn query(name: &str, sql: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: ObjectName::parse(name),
            source: TableSource::Query(sql.into()),
            schema: Arc::new(schema),
        }
    }

    /// Qualifier given to the fields of a scan over this table.
    pub fn qualifier(&self) -> &str {
        self.name.short_name()
    }
}

/// Catalog interface for resolving table schemas.
pub trait Catalog: Send + Sync {
    /// Resolves a table by name.
    fn resolve_table(&self, name: &str) -> Option<TableMeta>;
}

/// In-memory catalog for tests and embedding.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: RwLock<HashMap<String, TableMeta>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    pub fn register(&self, meta: TableMeta) {
        self.tables.write().insert(meta.name.to_string(), meta);
    }

    /// Removes a table, returning its metadata.
    pub fn deregister(&self, name: &str) -> Option<TableMeta> {
        self.tables.write().remove(name)
    }

    /// Returns the registered names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Catalog for MemoryCatalog {
    fn resolve_table(&self, name: &str) -> Option<TableMeta> {
        self.tables.read().get(name).cloned()
    }
}
