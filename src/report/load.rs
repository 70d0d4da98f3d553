use arrow::{
    compute::concat_batches,
    csv::ReaderBuilder,
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use std::{fs, io::Cursor, path::Path, sync::Arc};
use tracing::{debug, info, warn};

use crate::error::{ReportError, Result};
use crate::report::table::{clean_str, text_field};

const BATCH_SIZE: usize = 8192;

/// Header names from the first CSV record.
fn read_headers(data: &[u8]) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(data));
    let headers = rdr
        .headers()
        .map_err(|e| ReportError::input_format(format!("unreadable header row: {}", e)))?;

    let names: Vec<String> = headers.iter().map(clean_str).collect();
    if names.is_empty() || names.iter().all(|n| n.is_empty()) {
        return Err(ReportError::input_format("missing header row"));
    }
    Ok(names)
}

/// Parse CSV bytes into a single batch of nullable text columns.
///
/// Every column is read as `Utf8`; numeric interpretation happens later, per
/// derived column. Empty fields come back as nulls.
pub fn load_csv_bytes(data: &[u8]) -> Result<RecordBatch> {
    let text = std::str::from_utf8(data)
        .map_err(|e| ReportError::input_format(format!("input is not UTF-8: {}", e)))?;
    let headers = read_headers(text.as_bytes())?;

    let fields: Vec<Field> = headers.iter().map(|n| text_field(n)).collect();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_quote(b'"')
        .with_delimiter(b',')
        .build(Cursor::new(text.as_bytes()))
        .map_err(|e| ReportError::input_format(format!("creating CSV reader: {}", e)))?;

    let mut batches = Vec::new();
    for batch in reader {
        match batch {
            Ok(b) => batches.push(b),
            Err(e) => {
                let lines: Vec<&str> = text.lines().take(3).collect();
                warn!("CSV parsing failed. First few lines: {:?}", lines);
                warn!("Expected {} fields, error: {}", headers.len(), e);
                return Err(ReportError::input_format(format!("reading CSV: {}", e)));
            }
        }
    }

    let table = concat_batches(&schema, &batches)?;
    debug!(columns = table.num_columns(), "parsed CSV header {:?}", headers);
    Ok(table)
}

#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_csv_file<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let data = fs::read(path.as_ref())?;
    let table = load_csv_bytes(&data)?;
    info!(rows = table.num_rows(), columns = table.num_columns(), "loaded report");
    Ok(table)
}
