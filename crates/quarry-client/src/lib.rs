//! # quarry-client
//!
//! Lazy DataFrame API over quarry plans.
//!
//! This crate provides the user-facing half of quarry. It includes:
//!
//! - **Sessions**: an explicit context holding the dialect, catalog,
//!   configuration and the adapter that runs compiled SQL
//! - **DataFrames**: immutable, lazily evaluated relations whose
//!   transformations are resolved as they are called
//! - **Session Adapters**: the execution boundary, with an in-memory mock
//!   for tests
//! - **Result Validation**: returned rows are checked against the resolved
//!   schema
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use quarry_client::functions::{col, lit, sum};
//! use quarry_client::{ClientResult, Session};
//! use quarry_sql::logical::{MemoryCatalog, TableMeta};
//! use quarry_sql::{DataType, Field, Schema};
//!
//! fn example() -> ClientResult<()> {
//!     let catalog = MemoryCatalog::new();
//!     catalog.register(TableMeta::new(
//!         "orders",
//!         Schema::new(vec![
//!             Field::not_null("user_id", DataType::BigInt),
//!             Field::nullable("amount", DataType::Double),
//!         ]),
//!     ));
//!     let session = Session::builder().catalog(Arc::new(catalog)).build()?;
//!
//!     let totals = session
//!         .table("orders")?
//!         .filter(col("amount").gt(lit(0)))?
//!         .group_by(vec![col("user_id")])
//!         .agg(vec![sum(col("amount")).alias("total")])?;
//!
//!     println!("{}", totals.to_sql()?);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Session adapters and result values.
pub mod adapter;

/// Sessions.
pub mod session;

/// DataFrames.
pub mod dataframe;

/// Expression helpers.
pub mod functions;

/// Window specification helpers.
pub mod window;

// Re-exports
pub use adapter::{ExecutedStatement, FromValue, MockAdapter, Row, RowIter, SessionAdapter, Value};
pub use dataframe::{DataFrame, GroupedData};
pub use error::{ClientError, ClientResult};
pub use quarry_sql::logical::{JoinType, SortExpr};
pub use session::{QueryResult, Session, SessionBuilder, SessionStats};
pub use window::Window;
