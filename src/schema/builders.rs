use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaBuilder};

use super::columns;
use super::constants::{FIELD_UNIT, KEY_FORMAT_VERSION, TILT_SERIES_FORMAT_VERSION};

/// Creates a Field annotated with its physical unit
fn field_with_unit(name: &str, data_type: DataType, unit: &str) -> Field {
    let mut metadata = HashMap::new();
    metadata.insert(FIELD_UNIT.to_string(), unit.to_string());
    Field::new(name, data_type, false).with_metadata(metadata)
}

/// Creates the Arrow schema of a tilt-series table.
///
/// One row per tilt image, in ascending tilt-angle order. Series-level values
/// (`ts_id`, `sampling_rate`) repeat on every row and compress away under RLE.
///
/// # Example
///
/// ```
/// use tomostream::schema::create_tilt_image_schema;
///
/// let schema = create_tilt_image_schema();
/// assert_eq!(schema.fields().len(), 9);
/// ```
pub fn create_tilt_image_schema() -> Schema {
    let mut builder = SchemaBuilder::new();

    builder.push(Field::new(columns::TS_ID, DataType::Utf8, false));
    builder.push(Field::new(columns::INDEX, DataType::Int32, false));
    builder.push(Field::new(columns::ACQUISITION_ORDER, DataType::Int32, false));
    builder.push(field_with_unit(columns::TILT_ANGLE, DataType::Float64, "deg"));
    builder.push(field_with_unit(columns::SAMPLING_RATE, DataType::Float64, "A/px"));
    builder.push(field_with_unit(columns::DOSE_PER_FRAME, DataType::Float64, "e/A^2"));
    builder.push(field_with_unit(columns::ACCUMULATED_DOSE, DataType::Float64, "e/A^2"));
    builder.push(Field::new(columns::LOCATION, DataType::Utf8, false));
    builder.push(Field::new(columns::LOCATION_INDEX, DataType::Int32, false));

    let mut schema_metadata = HashMap::new();
    schema_metadata.insert(
        KEY_FORMAT_VERSION.to_string(),
        TILT_SERIES_FORMAT_VERSION.to_string(),
    );

    builder.finish().with_metadata(schema_metadata)
}

/// Creates an Arc-wrapped tilt-series schema for shared ownership
pub fn create_tilt_image_schema_arc() -> Arc<Schema> {
    Arc::new(create_tilt_image_schema())
}
