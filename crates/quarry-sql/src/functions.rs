//! Built-in function registry.
//!
//! Functions are identified by a lower-case logical name. Dialects map
//! logical names onto their own spelling when SQL is emitted.

use crate::types::DataType;

/// Where a function may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Row-level function.
    Scalar,
    /// Aggregate; also usable as a window function with `OVER`.
    Aggregate,
    /// Only valid with an `OVER` clause.
    Window,
}

/// How the return type is derived from the argument types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    /// Always this type.
    Fixed(DataType),
    /// Type of the first argument.
    FirstArg,
    /// Widest type of all arguments.
    WidenArgs,
    /// Integer sums widen to BIGINT, float sums to DOUBLE.
    Sum,
    /// DECIMAL stays DECIMAL, everything else becomes DOUBLE.
    Average,
}

/// Type constraint on the arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Any type.
    Any,
    /// Every argument must be numeric.
    Numeric,
    /// The first argument must be a string.
    String,
}

/// How nullability of the result is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    /// Nullable when any argument is nullable.
    AnyArg,
    /// Nullable only when every argument is nullable.
    AllArgs,
    /// Always nullable.
    Always,
    /// Never nullable.
    Never,
}

/// Signature of a registered function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Logical name (lower case).
    pub name: &'static str,
    /// Minimum number of arguments.
    pub min_args: usize,
    /// Maximum number of arguments; `None` is variadic.
    pub max_args: Option<usize>,
    /// Scalar, aggregate or window-only.
    pub kind: FunctionKind,
    /// Argument constraint.
    pub arguments: ArgumentKind,
    /// Return type rule.
    pub return_type: ReturnType,
    /// Nullability rule.
    pub nullability: Nullability,
    /// Emitted without parentheses (`CURRENT_DATE`).
    pub niladic: bool,
}

impl FunctionSignature {
    const fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        kind: FunctionKind,
        return_type: ReturnType,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind,
            arguments: ArgumentKind::Any,
            return_type,
            nullability: Nullability::AnyArg,
            niladic: false,
        }
    }

    const fn args(mut self, arguments: ArgumentKind) -> Self {
        self.arguments = arguments;
        self
    }

    const fn nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    const fn niladic(mut self) -> Self {
        self.niladic = true;
        self
    }

    /// Returns true if `count` arguments are accepted.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Human-readable arity, e.g. `1`, `1..=3` or `at least 1`.
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..={}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }

    /// Returns true for aggregates.
    pub fn is_aggregate(&self) -> bool {
        self.kind == FunctionKind::Aggregate
    }

    /// Returns true for functions that require an `OVER` clause.
    pub fn is_window_only(&self) -> bool {
        self.kind == FunctionKind::Window
    }

    /// Computes the return type for the given argument types.
    pub fn return_type(&self, args: &[DataType]) -> Option<DataType> {
        match &self.return_type {
            ReturnType::Fixed(t) => Some(t.clone()),
            ReturnType::FirstArg => args.first().cloned(),
            ReturnType::WidenArgs => {
                let mut iter = args.iter();
                let first = iter.next()?.clone();
                iter.try_fold(first, |acc, t| acc.widen(t))
            }
            ReturnType::Sum => args.first().map(|t| match t {
                t if t.is_integer() => DataType::BigInt,
                DataType::Float | DataType::Double => DataType::Double,
                other => other.clone(),
            }),
            ReturnType::Average => args.first().map(|t| match t {
                DataType::Decimal { .. } => t.clone(),
                _ => DataType::Double,
            }),
        }
    }

    /// Computes result nullability from argument nullability.
    pub fn result_nullable(&self, args: &[bool]) -> bool {
        match self.nullability {
            Nullability::AnyArg => args.iter().any(|n| *n),
            Nullability::AllArgs => !args.is_empty() && args.iter().all(|n| *n),
            Nullability::Always => true,
            Nullability::Never => false,
        }
    }
}

use FunctionKind::{Aggregate, Scalar, Window};

const VARCHAR: DataType = DataType::Varchar(None);

static FUNCTIONS: &[FunctionSignature] = &[
    // =========================================================================
    // Scalar functions
    // =========================================================================
    FunctionSignature::new("upper", 1, Some(1), Scalar, ReturnType::Fixed(VARCHAR))
        .args(ArgumentKind::String),
    FunctionSignature::new("lower", 1, Some(1), Scalar, ReturnType::Fixed(VARCHAR))
        .args(ArgumentKind::String),
    FunctionSignature::new("length", 1, Some(1), Scalar, ReturnType::Fixed(DataType::BigInt))
        .args(ArgumentKind::String),
    FunctionSignature::new("substring", 2, Some(3), Scalar, ReturnType::Fixed(VARCHAR))
        .args(ArgumentKind::String),
    FunctionSignature::new("trim", 1, Some(1), Scalar, ReturnType::Fixed(VARCHAR))
        .args(ArgumentKind::String),
    FunctionSignature::new("ltrim", 1, Some(1), Scalar, ReturnType::Fixed(VARCHAR))
        .args(ArgumentKind::String),
    FunctionSignature::new("rtrim", 1, Some(1), Scalar, ReturnType::Fixed(VARCHAR))
        .args(ArgumentKind::String),
    FunctionSignature::new("replace", 3, Some(3), Scalar, ReturnType::Fixed(VARCHAR))
        .args(ArgumentKind::String),
    FunctionSignature::new("concat", 1, None, Scalar, ReturnType::Fixed(VARCHAR)),
    FunctionSignature::new("coalesce", 1, None, Scalar, ReturnType::WidenArgs)
        .nullability(Nullability::AllArgs),
    FunctionSignature::new("ifnull", 2, Some(2), Scalar, ReturnType::WidenArgs)
        .nullability(Nullability::AllArgs),
    FunctionSignature::new("nullif", 2, Some(2), Scalar, ReturnType::FirstArg)
        .nullability(Nullability::Always),
    FunctionSignature::new("abs", 1, Some(1), Scalar, ReturnType::FirstArg)
        .args(ArgumentKind::Numeric),
    FunctionSignature::new("round", 1, Some(2), Scalar, ReturnType::FirstArg)
        .args(ArgumentKind::Numeric),
    FunctionSignature::new("floor", 1, Some(1), Scalar, ReturnType::FirstArg)
        .args(ArgumentKind::Numeric),
    FunctionSignature::new("ceil", 1, Some(1), Scalar, ReturnType::FirstArg)
        .args(ArgumentKind::Numeric),
    FunctionSignature::new("sqrt", 1, Some(1), Scalar, ReturnType::Fixed(DataType::Double))
        .args(ArgumentKind::Numeric),
    FunctionSignature::new("power", 2, Some(2), Scalar, ReturnType::Fixed(DataType::Double))
        .args(ArgumentKind::Numeric),
    FunctionSignature::new("mod", 2, Some(2), Scalar, ReturnType::WidenArgs)
        .args(ArgumentKind::Numeric),
    FunctionSignature::new("current_date", 0, Some(0), Scalar, ReturnType::Fixed(DataType::Date))
        .nullability(Nullability::Never)
        .niladic(),
    FunctionSignature::new(
        "current_timestamp",
        0,
        Some(0),
        Scalar,
        ReturnType::Fixed(DataType::Timestamp),
    )
    .nullability(Nullability::Never)
    .niladic(),
    // =========================================================================
    // Aggregate functions
    // =========================================================================
    FunctionSignature::new("count", 1, Some(1), Aggregate, ReturnType::Fixed(DataType::BigInt))
        .nullability(Nullability::Never),
    FunctionSignature::new("sum", 1, Some(1), Aggregate, ReturnType::Sum)
        .args(ArgumentKind::Numeric)
        .nullability(Nullability::Always),
    FunctionSignature::new("avg", 1, Some(1), Aggregate, ReturnType::Average)
        .args(ArgumentKind::Numeric)
        .nullability(Nullability::Always),
    FunctionSignature::new("min", 1, Some(1), Aggregate, ReturnType::FirstArg)
        .nullability(Nullability::Always),
    FunctionSignature::new("max", 1, Some(1), Aggregate, ReturnType::FirstArg)
        .nullability(Nullability::Always),
    FunctionSignature::new("stddev", 1, Some(1), Aggregate, ReturnType::Fixed(DataType::Double))
        .args(ArgumentKind::Numeric)
        .nullability(Nullability::Always),
    FunctionSignature::new("listagg", 2, Some(2), Aggregate, ReturnType::Fixed(VARCHAR))
        .nullability(Nullability::Always),
    // =========================================================================
    // Window-only functions
    // =========================================================================
    FunctionSignature::new("row_number", 0, Some(0), Window, ReturnType::Fixed(DataType::BigInt))
        .nullability(Nullability::Never),
    FunctionSignature::new("rank", 0, Some(0), Window, ReturnType::Fixed(DataType::BigInt))
        .nullability(Nullability::Never),
    FunctionSignature::new("dense_rank", 0, Some(0), Window, ReturnType::Fixed(DataType::BigInt))
        .nullability(Nullability::Never),
    FunctionSignature::new(
        "percent_rank",
        0,
        Some(0),
        Window,
        ReturnType::Fixed(DataType::Double),
    )
    .nullability(Nullability::Never),
    FunctionSignature::new("cume_dist", 0, Some(0), Window, ReturnType::Fixed(DataType::Double))
        .nullability(Nullability::Never),
    FunctionSignature::new("ntile", 1, Some(1), Window, ReturnType::Fixed(DataType::BigInt))
        .args(ArgumentKind::Numeric)
        .nullability(Nullability::Never),
    FunctionSignature::new("lag", 1, Some(3), Window, ReturnType::FirstArg)
        .nullability(Nullability::Always),
    FunctionSignature::new("lead", 1, Some(3), Window, ReturnType::FirstArg)
        .nullability(Nullability::Always),
    FunctionSignature::new("first_value", 1, Some(1), Window, ReturnType::FirstArg)
        .nullability(Nullability::Always),
    FunctionSignature::new("last_value", 1, Some(1), Window, ReturnType::FirstArg)
        .nullability(Nullability::Always),
];

/// Looks up a function by logical name (case-insensitive).
pub fn lookup(name: &str) -> Option<&'static FunctionSignature> {
    FUNCTIONS
        .iter()
        .find(|sig| sig.name.eq_ignore_ascii_case(name))
}

/// Returns every registered function.
pub fn all() -> &'static [FunctionSignature] {
    FUNCTIONS
}
