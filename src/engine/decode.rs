//! Arrow batches -> plain JSON row maps

use crate::engine::ResultRow;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use serde_json::{Map, Value};

/// Decode every row of every batch, keys in the batch's column order
pub fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<ResultRow>, ArrowError> {
    let options = FormatOptions::default();
    let mut rows = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());

    for batch in batches {
        let schema = batch.schema();
        let columns = batch
            .columns()
            .iter()
            .map(|array| ColumnDecoder::try_new(array, &options))
            .collect::<Result<Vec<_>, _>>()?;

        for idx in 0..batch.num_rows() {
            let mut row = Map::with_capacity(columns.len());
            for (field, column) in schema.fields().iter().zip(&columns) {
                row.insert(field.name().clone(), column.value(idx));
            }
            rows.push(row);
        }
    }

    Ok(rows)
}

struct ColumnDecoder<'a> {
    array: &'a ArrayRef,
    // Only built for types without a native JSON form
    formatter: Option<ArrayFormatter<'a>>,
}

impl<'a> ColumnDecoder<'a> {
    fn try_new(array: &'a ArrayRef, options: &FormatOptions<'a>) -> Result<Self, ArrowError> {
        let formatter = if has_native_json(array.data_type()) {
            None
        } else {
            Some(ArrayFormatter::try_new(array.as_ref(), options)?)
        };
        Ok(ColumnDecoder { array, formatter })
    }

    fn value(&self, idx: usize) -> Value {
        if self.array.is_null(idx) {
            return Value::Null;
        }

        let array = self.array;
        match array.data_type() {
            DataType::Null => Value::Null,
            DataType::Boolean => Value::Bool(array.as_boolean().value(idx)),
            DataType::Int8 => Value::from(array.as_primitive::<Int8Type>().value(idx)),
            DataType::Int16 => Value::from(array.as_primitive::<Int16Type>().value(idx)),
            DataType::Int32 => Value::from(array.as_primitive::<Int32Type>().value(idx)),
            DataType::Int64 => Value::from(array.as_primitive::<Int64Type>().value(idx)),
            DataType::UInt8 => Value::from(array.as_primitive::<UInt8Type>().value(idx)),
            DataType::UInt16 => Value::from(array.as_primitive::<UInt16Type>().value(idx)),
            DataType::UInt32 => Value::from(array.as_primitive::<UInt32Type>().value(idx)),
            DataType::UInt64 => Value::from(array.as_primitive::<UInt64Type>().value(idx)),
            // Non-finite floats have no JSON form and become null
            DataType::Float32 => Value::from(array.as_primitive::<Float32Type>().value(idx)),
            DataType::Float64 => Value::from(array.as_primitive::<Float64Type>().value(idx)),
            DataType::Utf8 => Value::String(array.as_string::<i32>().value(idx).to_string()),
            DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(idx).to_string()),
            DataType::Utf8View => Value::String(array.as_string_view().value(idx).to_string()),
            _ => match &self.formatter {
                Some(formatter) => Value::String(formatter.value(idx).to_string()),
                None => Value::Null,
            },
        }
    }
}

fn has_native_json(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Null
            | DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Utf8View
    )
}
