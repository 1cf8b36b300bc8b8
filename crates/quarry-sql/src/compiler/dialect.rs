//! SQL dialect descriptors.
//!
//! A [`Dialect`] tells the compiler how a target engine spells identifiers,
//! functions, placeholders and row limits, and which constructs it cannot
//! express at all.

use std::fmt;
use std::sync::Arc;

use quarry_common::DEFAULT_DIALECT;

use super::{CompileError, CompileResult};
use crate::types::{bytes_to_hex, DataType, Literal};

/// How a dialect folds unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierCase {
    /// Unquoted names are upper-cased.
    Upper,
    /// Unquoted names are lower-cased.
    Lower,
    /// Unquoted names keep their case.
    Preserve,
}

/// Spelling of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    QuestionMark,
    /// `$1`, `$2`, ...
    Dollar,
    /// `:1`, `:2`, ...
    Colon,
    /// `@p1`, `@p2`, ...
    AtP,
}

impl PlaceholderStyle {
    /// Renders the placeholder for the 1-based parameter `index`.
    pub fn render(&self, index: usize) -> String {
        match self {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${}", index),
            PlaceholderStyle::Colon => format!(":{}", index),
            PlaceholderStyle::AtP => format!("@p{}", index),
        }
    }
}

/// How row limits are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `SELECT TOP n ...`, falling back to `OFFSET ... FETCH` with an offset.
    Top,
    /// `OFFSET m ROWS FETCH FIRST n ROWS ONLY`
    OffsetFetch,
}

/// Optional constructs a dialect may lack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectFeatures {
    /// `FULL OUTER JOIN`
    pub full_outer_join: bool,
    /// `INTERSECT ALL`
    pub intersect_all: bool,
    /// `EXCEPT ALL`
    pub except_all: bool,
    /// `NULLS FIRST` / `NULLS LAST` in sort keys.
    pub nulls_ordering: bool,
    /// `ROWS`/`RANGE` frames in window specifications.
    pub window_frames: bool,
    /// `RANGE` frames with numeric offsets.
    pub range_frame_offsets: bool,
    /// Table-less selects with a `WHERE` clause need `FROM DUAL`.
    pub from_dual: bool,
}

impl Default for DialectFeatures {
    fn default() -> Self {
        Self {
            full_outer_join: true,
            intersect_all: true,
            except_all: true,
            nulls_ordering: true,
            window_frames: true,
            range_frame_offsets: true,
            from_dual: false,
        }
    }
}

/// Words that always need quoting when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE",
    "END", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "FULL", "GRANT",
    "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE",
    "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "OVER",
    "PARTITION", "PRIMARY", "RANGE", "REFERENCES", "RIGHT", "ROW", "ROWS", "SELECT", "SET",
    "SOME", "TABLE", "THEN", "TO", "TOP", "TRUE", "UNION", "UNIQUE", "UPDATE", "USER", "USING",
    "VALUES", "WHEN", "WHERE", "WINDOW", "WITH",
];

/// Syntax, quoting and naming rules of a target engine.
///
/// Every method has an ANSI default; built-in dialects override what
/// differs.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Configuration name of the dialect.
    fn name(&self) -> &'static str;

    /// Opening and closing identifier quote characters.
    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    /// Case folding applied to unquoted identifiers.
    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Upper
    }

    /// Returns true if `word` cannot be used unquoted.
    fn is_reserved(&self, word: &str) -> bool {
        RESERVED_WORDS
            .binary_search(&word.to_ascii_uppercase().as_str())
            .is_ok()
    }

    /// Spelling of a registered function, or `None` when the dialect has
    /// no equivalent.
    fn function_name(&self, name: &str) -> Option<String> {
        match name {
            "ifnull" => Some("COALESCE".to_string()),
            "stddev" => Some("STDDEV_SAMP".to_string()),
            other => Some(other.to_ascii_uppercase()),
        }
    }

    /// Infix string concatenation operator; `None` emits `CONCAT(a, b)`.
    fn concat_operator(&self) -> Option<&'static str> {
        Some("||")
    }

    /// Placeholder spelling for bound parameters.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    /// Row limit syntax.
    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
    }

    /// Row count meaning "no limit", for an offset without a fetch under
    /// `LIMIT/OFFSET` syntax. `None` lets `OFFSET` stand alone.
    fn unbounded_limit(&self) -> Option<&'static str> {
        None
    }

    /// Optional constructs this dialect supports.
    fn features(&self) -> DialectFeatures {
        DialectFeatures::default()
    }

    /// Spelling of a boolean literal.
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Spelling of a binary literal.
    fn blob_literal(&self, bytes: &[u8]) -> String {
        format!("X'{}'", bytes_to_hex(bytes))
    }

    /// Type name used in `CAST`.
    fn type_name(&self, data_type: &DataType) -> CompileResult<String> {
        standard_type_name(self.name(), data_type)
    }

    /// Quotes an identifier unconditionally.
    fn quote(&self, ident: &str) -> String {
        let (open, close) = self.quote_chars();
        let escaped = ident.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Returns true if `ident` must be quoted to keep its spelling.
    fn needs_quotes(&self, ident: &str) -> bool {
        let mut chars = ident.chars();
        let simple = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if !simple || self.is_reserved(ident) {
            return true;
        }
        match self.identifier_case() {
            IdentifierCase::Upper => ident.chars().any(|c| c.is_ascii_lowercase()),
            IdentifierCase::Lower => ident.chars().any(|c| c.is_ascii_uppercase()),
            IdentifierCase::Preserve => false,
        }
    }

    /// Renders an inline literal.
    fn literal(&self, literal: &Literal) -> CompileResult<String> {
        Ok(match literal {
            Literal::Null => "NULL".to_string(),
            Literal::Boolean(b) => self.boolean_literal(*b).to_string(),
            Literal::Integer(i) => i.to_string(),
            Literal::Float(f) if f.is_finite() => format!("{f:?}"),
            Literal::Float(f) => {
                return Err(CompileError::unsupported(
                    self.name(),
                    format!("non-finite float literal {f}"),
                ))
            }
            Literal::String(s) if s.contains('\0') => {
                return Err(CompileError::InvalidArgument(
                    "string literal contains a NUL character".to_string(),
                ))
            }
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
            Literal::Blob(bytes) => self.blob_literal(bytes),
        })
    }
}

/// ANSI spelling of `data_type`.
fn standard_type_name(dialect: &str, data_type: &DataType) -> CompileResult<String> {
    match data_type {
        DataType::Null => Err(CompileError::unsupported(dialect, "CAST to the NULL type")),
        DataType::Array(_) => Err(CompileError::unsupported(dialect, "ARRAY types")),
        DataType::TimestampTz => Ok("TIMESTAMP WITH TIME ZONE".to_string()),
        DataType::Double => Ok("DOUBLE PRECISION".to_string()),
        other => Ok(other.to_string()),
    }
}

/// ANSI SQL:2016.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn name(&self) -> &'static str {
        "ansi"
    }
}

/// Snowflake.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeDialect;

impl Dialect for SnowflakeDialect {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn function_name(&self, name: &str) -> Option<String> {
        Some(name.to_ascii_uppercase())
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Colon
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("NULL")
    }

    fn features(&self) -> DialectFeatures {
        DialectFeatures {
            intersect_all: false,
            except_all: false,
            ..DialectFeatures::default()
        }
    }

    fn type_name(&self, data_type: &DataType) -> CompileResult<String> {
        match data_type {
            DataType::TimestampTz => Ok("TIMESTAMP_TZ".to_string()),
            DataType::Double => Ok("DOUBLE".to_string()),
            DataType::Json => Ok("VARIANT".to_string()),
            DataType::Uuid => Ok("VARCHAR(36)".to_string()),
            DataType::Blob => Ok("BINARY".to_string()),
            other => standard_type_name(self.name(), other),
        }
    }
}

/// PostgreSQL.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Lower
    }

    fn function_name(&self, name: &str) -> Option<String> {
        match name {
            "ifnull" => Some("COALESCE".to_string()),
            "listagg" => Some("STRING_AGG".to_string()),
            other => Some(other.to_ascii_uppercase()),
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    fn blob_literal(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::BYTEA", bytes_to_hex(bytes))
    }

    fn type_name(&self, data_type: &DataType) -> CompileResult<String> {
        match data_type {
            DataType::TinyInt => Ok("SMALLINT".to_string()),
            DataType::Blob => Ok("BYTEA".to_string()),
            DataType::Json => Ok("JSONB".to_string()),
            other => standard_type_name(self.name(), other),
        }
    }
}

/// MySQL 8.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Preserve
    }

    fn function_name(&self, name: &str) -> Option<String> {
        match name {
            // GROUP_CONCAT takes its separator as a clause, not an argument.
            "listagg" => None,
            other => Some(other.to_ascii_uppercase()),
        }
    }

    fn concat_operator(&self) -> Option<&'static str> {
        None
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("18446744073709551615")
    }

    fn features(&self) -> DialectFeatures {
        DialectFeatures {
            full_outer_join: false,
            intersect_all: false,
            except_all: false,
            nulls_ordering: false,
            from_dual: true,
            ..DialectFeatures::default()
        }
    }

    fn type_name(&self, data_type: &DataType) -> CompileResult<String> {
        match data_type {
            t if t.is_integer() => Ok("SIGNED".to_string()),
            DataType::Boolean => Ok("UNSIGNED".to_string()),
            DataType::Float | DataType::Double => Ok("DOUBLE".to_string()),
            DataType::Char(len) | DataType::Varchar(len) => Ok(match len {
                Some(l) => format!("CHAR({l})"),
                None => "CHAR".to_string(),
            }),
            DataType::Text | DataType::Uuid => Ok("CHAR".to_string()),
            DataType::Blob => Ok("BINARY".to_string()),
            DataType::Timestamp | DataType::TimestampTz => Ok("DATETIME".to_string()),
            DataType::Interval => Err(CompileError::unsupported(self.name(), "CAST to INTERVAL")),
            other => standard_type_name(self.name(), other),
        }
    }
}

/// Microsoft SQL Server.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsSqlDialect;

impl Dialect for MsSqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_chars(&self) -> (char, char) {
        ('[', ']')
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Preserve
    }

    fn function_name(&self, name: &str) -> Option<String> {
        match name {
            "ifnull" => Some("ISNULL".to_string()),
            "length" => Some("LEN".to_string()),
            "ceil" => Some("CEILING".to_string()),
            "stddev" => Some("STDEV".to_string()),
            "listagg" => Some("STRING_AGG".to_string()),
            "current_date" | "mod" => None,
            other => Some(other.to_ascii_uppercase()),
        }
    }

    fn concat_operator(&self) -> Option<&'static str> {
        None
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::AtP
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::Top
    }

    fn features(&self) -> DialectFeatures {
        DialectFeatures {
            intersect_all: false,
            except_all: false,
            nulls_ordering: false,
            range_frame_offsets: false,
            ..DialectFeatures::default()
        }
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn blob_literal(&self, bytes: &[u8]) -> String {
        format!("0x{}", bytes_to_hex(bytes))
    }

    fn type_name(&self, data_type: &DataType) -> CompileResult<String> {
        match data_type {
            DataType::Boolean => Ok("BIT".to_string()),
            DataType::Double => Ok("FLOAT".to_string()),
            DataType::Float => Ok("REAL".to_string()),
            DataType::Text | DataType::Json => Ok("NVARCHAR(MAX)".to_string()),
            DataType::Varchar(None) => Ok("NVARCHAR(MAX)".to_string()),
            DataType::Blob => Ok("VARBINARY(MAX)".to_string()),
            DataType::Timestamp => Ok("DATETIME2".to_string()),
            DataType::TimestampTz => Ok("DATETIMEOFFSET".to_string()),
            DataType::Uuid => Ok("UNIQUEIDENTIFIER".to_string()),
            DataType::Interval => Err(CompileError::unsupported(self.name(), "INTERVAL types")),
            other => standard_type_name(self.name(), other),
        }
    }
}

/// Looks up a built-in dialect by configuration name (case-insensitive).
pub fn dialect_for_name(name: &str) -> CompileResult<Arc<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "ansi" => Ok(Arc::new(AnsiDialect)),
        "snowflake" => Ok(Arc::new(SnowflakeDialect)),
        "postgres" | "postgresql" => Ok(Arc::new(PostgresDialect)),
        "mysql" => Ok(Arc::new(MySqlDialect)),
        "mssql" | "sqlserver" => Ok(Arc::new(MsSqlDialect)),
        _ => Err(CompileError::InvalidArgument(format!(
            "unknown dialect '{}'",
            name
        ))),
    }
}

/// The dialect used when none is configured.
pub fn default_dialect() -> Arc<dyn Dialect> {
    dialect_for_name(DEFAULT_DIALECT).unwrap_or_else(|_| Arc::new(AnsiDialect))
}
