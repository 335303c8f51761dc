use arrow::datatypes::{DataType, Schema};

use super::columns;

/// Validates that a schema is a readable tilt-series table.
///
/// Returns `Ok(())` if the schema contains all required columns with correct types,
/// or an error describing the incompatibility.
pub fn validate_schema(schema: &Schema) -> Result<(), SchemaValidationError> {
    let required_columns = [
        (columns::TS_ID, DataType::Utf8),
        (columns::INDEX, DataType::Int32),
        (columns::ACQUISITION_ORDER, DataType::Int32),
        (columns::TILT_ANGLE, DataType::Float64),
        (columns::SAMPLING_RATE, DataType::Float64),
        (columns::DOSE_PER_FRAME, DataType::Float64),
        (columns::ACCUMULATED_DOSE, DataType::Float64),
        (columns::LOCATION, DataType::Utf8),
        (columns::LOCATION_INDEX, DataType::Int32),
    ];

    for (name, expected_type) in required_columns {
        match schema.field_with_name(name) {
            Ok(field) => {
                if field.data_type() != &expected_type {
                    return Err(SchemaValidationError::TypeMismatch {
                        column: name.to_string(),
                        expected: format!("{:?}", expected_type),
                        found: format!("{:?}", field.data_type()),
                    });
                }
            }
            Err(_) => {
                return Err(SchemaValidationError::MissingColumn(name.to_string()));
            }
        }
    }

    Ok(())
}

/// Errors that can occur during schema validation
#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    /// A required column is missing from the schema
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A column has an incorrect data type
    #[error("Type mismatch for column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the column with the type mismatch
        column: String,
        /// Expected data type
        expected: String,
        /// Actual data type found
        found: String,
    },
}
