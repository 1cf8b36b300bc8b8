//! Schema representation for logical plans.
//!
//! Schemas describe the output columns of each operator in a logical plan.
//! Field names need not be unique; a reference is resolved by name plus
//! the qualifiers it carries (see [`Column::matches`]).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// A column in a schema, or a column reference in an expression.
///
/// Qualifiers are stored innermost first: a `users` scan joined as the
/// left side carries `["users", "left"]` and prints as `left.users.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Relation qualifiers, innermost first, without duplicates.
    pub qualifiers: Vec<String>,
    /// Column name.
    pub name: String,
}

impl Column {
    /// Creates a new unqualified column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifiers: Vec::new(),
            name: name.into(),
        }
    }

    /// Creates a new column with a single qualifier.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifiers: vec![qualifier.into()],
            name: name.into(),
        }
    }

    /// Parses a dotted reference such as `orders.amount` or `left.users.id`.
    pub fn from_qualified_name(reference: &str) -> Self {
        let mut parts: Vec<&str> = reference.split('.').collect();
        let name = parts.pop().unwrap_or_default();
        let mut column = Column::new(name);
        for qualifier in parts.into_iter().rev() {
            column = column.with_qualifier(qualifier);
        }
        column
    }

    /// Adds an outer qualifier unless already present.
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        let qualifier = qualifier.into();
        if !self.qualifiers.contains(&qualifier) {
            self.qualifiers.push(qualifier);
        }
        self
    }

    /// Replaces every qualifier with `qualifier`.
    pub fn requalified(&self, qualifier: impl Into<String>) -> Self {
        Self::qualified(qualifier, self.name.clone())
    }

    /// Returns the innermost qualifier.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifiers.first().map(String::as_str)
    }

    /// Returns true if the column carries no qualifier.
    pub fn is_unqualified(&self) -> bool {
        self.qualifiers.is_empty()
    }

    /// Returns the fully qualified name, outermost qualifier first.
    pub fn qualified_name(&self) -> String {
        let mut parts: Vec<&str> = self.qualifiers.iter().rev().map(String::as_str).collect();
        parts.push(&self.name);
        parts.join(".")
    }

    /// Returns true if this field column satisfies `reference`: the names
    /// are equal and every qualifier of the reference is carried here.
    pub fn matches(&self, reference: &Column) -> bool {
        self.name == reference.name
            && reference
                .qualifiers
                .iter()
                .all(|q| self.qualifiers.contains(q))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// A field in a schema (column + type + nullability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Column identifier.
    pub column: Column,
    /// Data type.
    pub data_type: DataType,
    /// Whether NULL is allowed.
    pub nullable: bool,
}

impl Field {
    /// Creates a new field.
    pub fn new(column: Column, data_type: DataType, nullable: bool) -> Self {
        Self {
            column,
            data_type,
            nullable,
        }
    }

    /// Creates a new non-nullable field.
    pub fn not_null(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(Column::new(name), data_type, false)
    }

    /// Creates a new nullable field.
    pub fn nullable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(Column::new(name), data_type, true)
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.column.name
    }

    /// Returns the qualified column name.
    pub fn qualified_name(&self) -> String {
        self.column.qualified_name()
    }

    /// Returns a copy with an additional outer qualifier.
    pub fn with_qualifier(&self, qualifier: &str) -> Self {
        Self {
            column: self.column.clone().with_qualifier(qualifier),
            ..self.clone()
        }
    }

    /// Returns a copy with the given nullability.
    pub fn with_nullable(&self, nullable: bool) -> Self {
        Self {
            nullable,
            ..self.clone()
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}",
            self.column,
            self.data_type,
            if self.nullable { "" } else { " NOT NULL" }
        )
    }
}

/// Schema describes the columns output by a plan node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Creates a schema from a list of fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field at the given index.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Returns the unqualified field names in order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    /// Returns the indices of every field matching `reference`.
    pub fn matches(&self, reference: &Column) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.column.matches(reference))
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the index of the only field matching `reference`.
    pub fn index_of_column(&self, reference: &Column) -> Option<usize> {
        match self.matches(reference).as_slice() {
            [index] => Some(*index),
            _ => None,
        }
    }

    /// Finds the only field matching a dotted name.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.index_of_column(&Column::from_qualified_name(name))
            .and_then(|i| self.fields.get(i))
    }

    /// Concatenates two schemas.
    pub fn merge(&self, other: &Schema) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().cloned());
        Schema::new(fields)
    }

    /// Projects the schema to the specified column indices.
    pub fn project(&self, indices: &[usize]) -> Self {
        let fields: Vec<_> = indices
            .iter()
            .filter_map(|&i| self.fields.get(i).cloned())
            .collect();
        Schema::new(fields)
    }

    /// Adds an outer qualifier to every field.
    pub fn with_qualifier(&self, qualifier: &str) -> Self {
        Schema::new(self.fields.iter().map(|f| f.with_qualifier(qualifier)).collect())
    }

    /// Replaces every field's qualifiers with `alias`.
    pub fn with_alias(&self, alias: &str) -> Self {
        Schema::new(
            self.fields
                .iter()
                .map(|f| Field::new(f.column.requalified(alias), f.data_type.clone(), f.nullable))
                .collect(),
        )
    }

    /// Returns the data types of all fields.
    pub fn data_types(&self) -> Vec<&DataType> {
        self.fields.iter().map(|f| &f.data_type).collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, "]")
    }
}

/// A reference-counted schema for sharing.
pub type SchemaRef = Arc<Schema>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column() {
        let col = Column::new("id");
        assert_eq!(col.name, "id");
        assert!(col.is_unqualified());
        assert_eq!(col.qualified_name(), "id");

        let qcol = Column::qualified("users", "id").with_qualifier("left");
        assert_eq!(qcol.qualified_name(), "left.users.id");
        assert_eq!(qcol.qualifier(), Some("users"));
    }

    #[test]
    fn test_column_parse() {
        let col = Column::from_qualified_name("left.users.id");
        assert_eq!(col.name, "id");
        assert_eq!(col.qualifiers, vec!["users".to_string(), "left".to_string()]);
        assert_eq!(Column::from_qualified_name("id"), Column::new("id"));
    }

    #[test]
    fn test_with_qualifier_deduplicates() {
        let col = Column::qualified("left", "id").with_qualifier("left");
        assert_eq!(col.qualifiers.len(), 1);
    }

    #[test]
    fn test_column_matches() {
        let field = Column::qualified("users", "id").with_qualifier("left");
        assert!(field.matches(&Column::new("id")));
        assert!(field.matches(&Column::qualified("users", "id")));
        assert!(field.matches(&Column::qualified("left", "id")));
        assert!(field.matches(&Column::from_qualified_name("left.users.id")));
        assert!(!field.matches(&Column::qualified("right", "id")));
        assert!(!field.matches(&Column::new("name")));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(vec![
            Field::not_null("id", DataType::Int).with_qualifier("users"),
            Field::nullable("name", DataType::Varchar(Some(255))),
            Field::not_null("id", DataType::Int).with_qualifier("orders"),
        ]);

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.matches(&Column::new("id")), vec![0, 2]);
        assert_eq!(schema.index_of_column(&Column::new("id")), None);
        assert_eq!(schema.index_of_column(&Column::qualified("orders", "id")), Some(2));
        assert!(schema.field_by_name("name").is_some());
        assert_eq!(schema.names(), vec!["id", "name", "id"]);
    }

    #[test]
    fn test_schema_merge_and_project() {
        let s1 = Schema::new(vec![Field::not_null("a", DataType::Int)]);
        let s2 = Schema::new(vec![
            Field::not_null("b", DataType::Int),
            Field::not_null("c", DataType::Int),
        ]);
        let merged = s1.merge(&s2);
        assert_eq!(merged.len(), 3);

        let projected = merged.project(&[0, 2]);
        assert_eq!(projected.names(), vec!["a", "c"]);
    }

    #[test]
    fn test_schema_alias() {
        let schema = Schema::new(vec![
            Field::not_null("a", DataType::Int).with_qualifier("users").with_qualifier("left"),
        ]);
        let aliased = schema.with_alias("u");
        assert_eq!(aliased.field(0).unwrap().qualified_name(), "u.a");
    }
}
