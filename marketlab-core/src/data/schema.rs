use polars::prelude::*;

/// Common price table schema shared with downstream consumers.
pub struct PriceSchema;

impl PriceSchema {
    /// Get the canonical price schema
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("timestamp".into(), DataType::Datetime(TimeUnit::Milliseconds, None)),
            Field::new("open".into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new("close".into(), DataType::Float64),
            Field::new("volume".into(), DataType::Float64),
            Field::new("symbol".into(), DataType::String),
        ])
    }
}

/// Persisted symbol table schema.
pub struct SymbolSchema;

impl SymbolSchema {
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("symbol".into(), DataType::String),
            Field::new("name".into(), DataType::String),
            Field::new("sector".into(), DataType::String),
            Field::new("sub_industry".into(), DataType::String),
            Field::new("exchange".into(), DataType::String),
            Field::new("fetched_at".into(), DataType::Datetime(TimeUnit::Milliseconds, None)),
        ])
    }
}

/// Validate that `df` carries every column of `expected` with the same dtype.
///
/// Extra columns are allowed.
pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
    let actual = df.schema();

    for field in expected.iter_fields() {
        let actual_dtype = actual
            .get(field.name())
            .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
        if actual_dtype != field.dtype() {
            return Err(SchemaError::TypeMismatch {
                column: field.name().to_string(),
                expected: field.dtype().clone(),
                actual: actual_dtype.clone(),
            });
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Invalid table: {0}")]
    Invalid(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
