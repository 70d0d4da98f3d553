use arrow::{
    array::{Array, ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::error::{ReportError, Result};

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a cell as a finite number. Empty, non-numeric, `NaN` and infinities are absent.
pub fn parse_number(raw: &str) -> Option<f64> {
    clean_str(raw).parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Position of the first column called `name`.
pub fn column_index(batch: &RecordBatch, name: &str) -> Option<usize> {
    batch
        .schema()
        .fields()
        .iter()
        .position(|f| f.name() == name)
}

pub fn require_column(batch: &RecordBatch, name: &str) -> Result<usize> {
    column_index(batch, name).ok_or_else(|| ReportError::missing_column(name))
}

pub fn string_column(batch: &RecordBatch, idx: usize) -> Result<&StringArray> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ReportError::ColumnType {
            column: batch.schema().field(idx).name().clone(),
        })
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Nullable text field, the only column type a report table carries.
pub fn text_field(name: &str) -> Field {
    Field::new(name, DataType::Utf8, true)
}

/// Replace the column called `name` in place, or append it when absent.
pub fn upsert_column(batch: &RecordBatch, name: &str, values: StringArray) -> Result<RecordBatch> {
    let mut fields: Vec<Arc<Field>> = batch.schema().fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    let values = Arc::new(values) as ArrayRef;

    match column_index(batch, name) {
        Some(idx) => columns[idx] = values,
        None => {
            fields.push(Arc::new(text_field(name)));
            columns.push(values);
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}

#[cfg(test)]
pub(crate) fn batch_from_rows(headers: &[&str], rows: &[&[Option<&str>]]) -> RecordBatch {
    let fields: Vec<Field> = headers.iter().map(|h| text_field(h)).collect();
    let columns: Vec<ArrayRef> = (0..headers.len())
        .map(|i| {
            let arr: StringArray = rows.iter().map(|r| r[i]).collect();
            Arc::new(arr) as ArrayRef
        })
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}
