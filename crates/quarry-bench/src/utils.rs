//! Benchmark utilities and helpers.
//!
//! Everything here is seeded so repeated runs build the same plans.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quarry_client::functions::{col, count_star, lit, sum};
use quarry_client::{ClientResult, DataFrame, JoinType, Session};
use quarry_sql::{DataType, Field, MemoryCatalog, Schema, TableMeta};

/// Seed shared by every generator.
pub const SEED: u64 = 42;

/// Builds a table named `name` with `width` columns `c0..cN`. The first
/// column is a non-null `BIGINT` key; the rest mix numeric and string
/// types.
pub fn wide_table(rng: &mut StdRng, name: &str, width: usize) -> TableMeta {
    let mut fields = vec![Field::not_null("c0", DataType::BigInt)];
    for i in 1..width.max(1) {
        let data_type = match rng.gen_range(0..3) {
            0 => DataType::Int,
            1 => DataType::Double,
            _ => DataType::Varchar(Some(32)),
        };
        fields.push(Field::nullable(format!("c{i}"), data_type));
    }
    TableMeta::new(name, Schema::new(fields))
}

/// A catalog with `tables` wide tables named `t0..tN`.
pub fn generate_catalog(tables: usize, width: usize) -> MemoryCatalog {
    let mut rng = StdRng::seed_from_u64(SEED);
    let catalog = MemoryCatalog::new();
    for i in 0..tables {
        catalog.register(wide_table(&mut rng, &format!("t{i}"), width));
    }
    catalog
}

/// Applies `depth` random transformations to `df`: filters on the key,
/// derived columns and re-projections. The key column survives every step
/// so later filters always resolve.
pub fn random_chain(rng: &mut StdRng, df: DataFrame, depth: usize) -> ClientResult<DataFrame> {
    let mut df = df;
    for step in 0..depth {
        df = match rng.gen_range(0..3) {
            0 => df.filter(col("c0").gt(lit(rng.gen_range(0..1000i64))))?,
            1 => df.with_column(&format!("d{step}"), col("c0").add(lit(step as i64)))?,
            _ => {
                let schema = df.schema();
                let names = schema.names();
                let keep = rng.gen_range(1..=names.len());
                df.select_columns(&names[..keep])?
            }
        };
    }
    Ok(df)
}

/// A report-style query: a join of two wide tables, a filter, a grouped
/// aggregate, an ordering and a limit.
pub fn report_query(session: &Session) -> ClientResult<DataFrame> {
    let facts = session.table("t0")?;
    let dims = session.table("t1")?;
    facts
        .join(&dims, col("t0.c0").eq(col("t1.c0")), JoinType::Inner)?
        .filter(col("left.c0").gt(lit(10)))?
        .group_by(vec![col("left.c0")])
        .agg(vec![
            count_star().alias("n"),
            sum(col("right.c0")).alias("total"),
        ])?
        .sort(vec![col("total").desc()])?
        .limit(100)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quarry_sql::Catalog;

    use super::*;

    fn session() -> Session {
        Session::builder()
            .catalog(Arc::new(generate_catalog(2, 8)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_catalog_is_seeded() {
        let a = generate_catalog(3, 6);
        let b = generate_catalog(3, 6);
        assert_eq!(a.table_names().len(), 3);
        for name in a.table_names() {
            let left = a.resolve_table(&name).unwrap();
            let right = b.resolve_table(&name).unwrap();
            assert_eq!(left.schema, right.schema);
            assert_eq!(left.schema.len(), 6);
        }
    }

    #[test]
    fn test_random_chain_compiles() {
        let session = session();
        let mut rng = StdRng::seed_from_u64(SEED);
        let df = random_chain(&mut rng, session.table("t0").unwrap(), 12).unwrap();
        assert!(df.to_sql().unwrap().starts_with("SELECT"));
    }

    #[test]
    fn test_report_query_compiles() {
        let session = session();
        let df = report_query(&session).unwrap();
        assert_eq!(df.schema().names(), vec!["c0", "n", "total"]);
        assert!(!df.to_sql().unwrap().is_empty());
    }
}
