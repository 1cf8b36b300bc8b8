//! Sessions configured from TOML files.

use std::sync::Arc;

use quarry_client::functions::{col, lit};
use quarry_client::{MockAdapter, Session};
use quarry_common::{ErrorCode, IdentifierQuoting, QuarryConfig};
use quarry_sql::logical::{MemoryCatalog, TableMeta};
use quarry_sql::{DataType, Field, Schema};
use tempfile::TempDir;

fn catalog() -> Arc<MemoryCatalog> {
    let catalog = MemoryCatalog::new();
    catalog.register(TableMeta::new(
        "events",
        Schema::new(vec![
            Field::not_null("id", DataType::BigInt),
            Field::nullable("kind", DataType::Varchar(Some(16))),
        ]),
    ));
    Arc::new(catalog)
}

#[test]
fn test_session_from_config_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("quarry.toml");
    std::fs::write(
        &path,
        r#"
[compiler]
dialect = "mssql"
identifier_quoting = "as_needed"
alias_prefix = "q"

[session]
max_rows = 10
"#,
    )?;

    let config = QuarryConfig::from_file(&path)?;
    assert_eq!(config.compiler.identifier_quoting, IdentifierQuoting::AsNeeded);
    assert!(config.session.validate_results);

    let session = Session::builder()
        .config(config)
        .catalog(catalog())
        .adapter(Arc::new(MockAdapter::new()))
        .build()?;
    let sql = session
        .table("events")?
        .filter(col("kind").eq(lit("click")))?
        .limit(3)?
        .to_sql()?;

    assert!(sql.starts_with("SELECT TOP 3 q0.id"), "{sql}");
    assert!(sql.ends_with("WHERE q0.kind = 'click'"), "{sql}");
    Ok(())
}

#[test]
fn test_saved_config_round_trips() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("quarry.toml");

    let config = QuarryConfig::builder()
        .dialect("snowflake")
        .parameterize_literals(true)
        .max_rows(500)
        .build();
    config.save(&path)?;

    let loaded = QuarryConfig::from_file(&path)?;
    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn test_invalid_config_file_rejected() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("quarry.toml");
    std::fs::write(&path, "[compiler]\nalias_prefix = \"9x\"\n")?;

    let config = QuarryConfig::from_file(&path)?;
    let err = Session::builder().config(config).build().unwrap_err();
    assert_eq!(err.code(), ErrorCode::Config);
    Ok(())
}
