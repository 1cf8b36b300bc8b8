//! SQL data types and literal values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data types understood by the resolver and the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of an untyped NULL literal; widens to any other type.
    Null,
    /// Boolean type.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Arbitrary precision decimal.
    Decimal {
        /// Total number of digits.
        precision: Option<u8>,
        /// Digits after decimal point.
        scale: Option<u8>,
    },
    /// Fixed-length string.
    Char(Option<u32>),
    /// Variable-length string.
    Varchar(Option<u32>),
    /// Unlimited text.
    Text,
    /// Binary data.
    Blob,
    /// Date (year, month, day).
    Date,
    /// Time (hour, minute, second).
    Time,
    /// Timestamp (date + time).
    Timestamp,
    /// Timestamp with timezone.
    TimestampTz,
    /// Interval type.
    Interval,
    /// UUID type.
    Uuid,
    /// JSON document.
    Json,
    /// Array of another type.
    Array(Box<DataType>),
}

impl DataType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt
                | DataType::SmallInt
                | DataType::Int
                | DataType::BigInt
                | DataType::Float
                | DataType::Double
                | DataType::Decimal { .. }
        )
    }

    /// Returns true if this type is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt
        )
    }

    /// Returns true if this type is a string type.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DataType::Char(_) | DataType::Varchar(_) | DataType::Text
        )
    }

    /// Returns true if this type is a temporal type.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date
                | DataType::Time
                | DataType::Timestamp
                | DataType::TimestampTz
                | DataType::Interval
        )
    }

    /// Returns true for the type of an untyped NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    /// Returns true if values of this type can appear in ORDER BY.
    pub fn is_orderable(&self) -> bool {
        !matches!(self, DataType::Json | DataType::Array(_))
    }

    /// Returns true if this type is boolean, or NULL.
    pub fn is_boolean_like(&self) -> bool {
        matches!(self, DataType::Boolean | DataType::Null)
    }

    /// Returns the smallest type both inputs convert to, if any.
    ///
    /// Used for comparisons, CASE branches, set operations, `USING` keys
    /// and `VALUES` columns.
    pub fn widen(&self, other: &DataType) -> Option<DataType> {
        if self == other {
            return Some(self.clone());
        }
        match (self, other) {
            (DataType::Null, t) | (t, DataType::Null) => Some(t.clone()),
            (a, b) if a.is_numeric() && b.is_numeric() => Some(widen_numeric(a, b)),
            (a, b) if a.is_string() && b.is_string() => Some(widen_string(a, b)),
            (DataType::Date, DataType::Timestamp) | (DataType::Timestamp, DataType::Date) => {
                Some(DataType::Timestamp)
            }
            (DataType::TimestampTz, DataType::Date | DataType::Timestamp)
            | (DataType::Date | DataType::Timestamp, DataType::TimestampTz) => {
                Some(DataType::TimestampTz)
            }
            (DataType::Array(a), DataType::Array(b)) => {
                a.widen(b).map(|t| DataType::Array(Box::new(t)))
            }
            _ => None,
        }
    }

    /// Returns true if values of both types can be compared.
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        self.widen(other).is_some()
    }
}

fn numeric_rank(t: &DataType) -> u8 {
    match t {
        DataType::TinyInt => 1,
        DataType::SmallInt => 2,
        DataType::Int => 3,
        DataType::BigInt => 4,
        DataType::Decimal { .. } => 5,
        DataType::Float => 6,
        _ => 7,
    }
}

fn widen_numeric(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        (DataType::Decimal { .. }, DataType::Float) | (DataType::Float, DataType::Decimal { .. }) => {
            DataType::Double
        }
        (DataType::Decimal { .. }, DataType::Decimal { .. }) => DataType::Decimal {
            precision: None,
            scale: None,
        },
        _ if numeric_rank(a) >= numeric_rank(b) => a.clone(),
        _ => b.clone(),
    }
}

fn widen_string(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        (DataType::Text, _) | (_, DataType::Text) => DataType::Text,
        (
            DataType::Char(x) | DataType::Varchar(x),
            DataType::Char(y) | DataType::Varchar(y),
        ) => match (x, y) {
            (Some(x), Some(y)) => DataType::Varchar(Some(*x.max(y))),
            _ => DataType::Varchar(None),
        },
        _ => DataType::Text,
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "NULL"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::TinyInt => write!(f, "TINYINT"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Int => write!(f, "INT"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => write!(f, "DECIMAL({p}, {s})"),
                (Some(p), None) => write!(f, "DECIMAL({p})"),
                _ => write!(f, "DECIMAL"),
            },
            DataType::Char(len) => match len {
                Some(l) => write!(f, "CHAR({l})"),
                None => write!(f, "CHAR"),
            },
            DataType::Varchar(len) => match len {
                Some(l) => write!(f, "VARCHAR({l})"),
                None => write!(f, "VARCHAR"),
            },
            DataType::Text => write!(f, "TEXT"),
            DataType::Blob => write!(f, "BLOB"),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::TimestampTz => write!(f, "TIMESTAMPTZ"),
            DataType::Interval => write!(f, "INTERVAL"),
            DataType::Uuid => write!(f, "UUID"),
            DataType::Json => write!(f, "JSON"),
            DataType::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// NULL value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Binary data.
    Blob(Vec<u8>),
}

impl Literal {
    /// Returns true if this is a NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Returns the type a literal carries before any widening.
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Null => DataType::Null,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Integer(_) => DataType::BigInt,
            Literal::Float(_) => DataType::Double,
            Literal::String(_) => DataType::Varchar(None),
            Literal::Blob(_) => DataType::Blob,
        }
    }

    /// Returns true for integer or float literals below zero.
    pub fn is_negative(&self) -> bool {
        match self {
            Literal::Integer(i) => *i < 0,
            Literal::Float(f) => f.is_sign_negative() && *f != 0.0,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Blob(b) => write!(f, "X'{}'", bytes_to_hex(b)),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Integer(i64::from(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<Vec<u8>> for Literal {
    fn from(value: Vec<u8>) -> Self {
        Literal::Blob(value)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map_or(Literal::Null, Into::into)
    }
}

/// Converts bytes to an upper-case hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
