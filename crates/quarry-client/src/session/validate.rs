//! Checks returned rows against a resolved schema.

use quarry_sql::Schema;

use crate::adapter::Row;
use crate::error::{ClientError, ClientResult};

/// Fails with [`ClientError::SchemaMismatch`] unless `row` has one value
/// per field, no NULL in a non-nullable field, and every value fits its
/// field's type.
pub(crate) fn check_row(index: usize, row: &Row, schema: &Schema) -> ClientResult<()> {
    if row.len() != schema.len() {
        return Err(mismatch(
            index,
            format!("expected {} values, got {}", schema.len(), row.len()),
        ));
    }

    for (value, field) in row.values().iter().zip(schema.fields()) {
        if value.is_null() {
            if !field.nullable {
                return Err(mismatch(
                    index,
                    format!("NULL in non-nullable column {}", field.name()),
                ));
            }
            continue;
        }
        if !value.fits(&field.data_type) {
            return Err(mismatch(
                index,
                format!(
                    "{} value in column {} of type {}",
                    value.kind(),
                    field.name(),
                    field.data_type
                ),
            ));
        }
    }
    Ok(())
}

fn mismatch(row: usize, message: String) -> ClientError {
    ClientError::SchemaMismatch { row, message }
}

#[cfg(test)]
mod tests {
    use quarry_sql::{DataType, Field};

    use super::*;
    use crate::adapter::Value;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::not_null("id", DataType::BigInt),
            Field::nullable("name", DataType::Varchar(Some(20))),
        ])
    }

    #[test]
    fn test_valid_rows() {
        let schema = schema();
        check_row(0, &Row::new(vec![Value::Integer(1), Value::Null]), &schema).unwrap();
        check_row(1, &Row::new(vec![Value::Integer(2), "bob".into()]), &schema).unwrap();
    }

    #[test]
    fn test_arity_mismatch() {
        let err = check_row(4, &Row::new(vec![Value::Integer(1)]), &schema()).unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch { row: 4, .. }));
        assert!(err.to_string().contains("expected 2 values, got 1"));
    }

    #[test]
    fn test_null_in_required_column() {
        let err = check_row(0, &Row::new(vec![Value::Null, Value::Null]), &schema()).unwrap_err();
        assert!(err.to_string().contains("non-nullable column id"));
    }

    #[test]
    fn test_type_mismatch() {
        let row = Row::new(vec![Value::String("one".into()), Value::Null]);
        let err = check_row(0, &row, &schema()).unwrap_err();
        assert!(err.to_string().contains("string value in column id"));
    }
}
