//! # quarry-bench
//!
//! Benchmarks for quarry.
//!
//! The benches measure the three stages a DataFrame goes through before
//! any SQL reaches a database:
//!
//! - **Build**: resolving each transformation against its input schema
//! - **Optimize**: running the rewrite rules to a fixed point
//! - **Compile**: rendering the plan as SQL text for each dialect
//!
//! Run with `cargo bench -p quarry-bench`.

pub mod utils;
