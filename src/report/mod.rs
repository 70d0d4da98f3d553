pub mod arrange;
pub mod line_id;
pub mod load;
pub mod ratio;
pub mod table;
pub mod threshold;
pub mod xlsx;

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Local};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::error::{ReportError, Result};

pub const LINE_ID: &str = "Line ID";
pub const PLACEMENT_TYPE: &str = "Placement Type";

pub const ARTIFACT_EXTENSION: &str = "xlsx";

/// Columns a report must carry for the derived columns to be computed.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    LINE_ID,
    "Impressions (GIVT)",
    "Impressions (Gross)",
    "Clicks (GIVT)",
    "Clicks (Gross)",
    "Viewable Impression",
    "Recordable Impression",
];

/// Fails on the first required column the table lacks.
pub fn check_required_columns(raw: &RecordBatch) -> Result<()> {
    for column in REQUIRED_COLUMNS {
        table::require_column(raw, column)?;
    }
    Ok(())
}

/// Split ids, derive ratios and arrange columns. The returned table is what
/// ends up in the worksheet.
pub fn transform_table(raw: &RecordBatch) -> Result<RecordBatch> {
    check_required_columns(raw)?;
    let with_ids = line_id::append_line_id_columns(raw)?;
    let with_ratios = ratio::append_ratio_columns(&with_ids)?;
    arrange::arrange_columns(&with_ratios)
}

pub fn build_report(csv: &[u8]) -> Result<RecordBatch> {
    let raw = load::load_csv_bytes(csv)?;
    transform_table(&raw)
}

/// CSV bytes in, XLSX bytes out. Nothing touches the filesystem.
pub fn render_report(csv: &[u8]) -> Result<Vec<u8>> {
    let table = build_report(csv)?;
    xlsx::workbook_bytes(&table)
}

/// `processed_<YYYYmmdd_HHMMSS>_<request id>.xlsx`
pub fn artifact_name(now: DateTime<Local>, request_id: &str) -> String {
    format!(
        "processed_{}_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        request_id,
        ARTIFACT_EXTENSION
    )
}

/// Process one saved CSV into `output_dir`, returning the artifact path.
///
/// The artifact only appears once it has been fully written; any failure
/// leaves `output_dir` untouched.
#[tracing::instrument(level = "info", skip(input, output_dir), fields(input = %input.as_ref().display()))]
pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
    request_id: &str,
) -> Result<PathBuf> {
    if request_id.is_empty() || request_id.contains(['/', '\\']) {
        return Err(ReportError::input_format(format!(
            "request id {:?} cannot be used in a file name",
            request_id
        )));
    }

    let raw = load::load_csv_file(input.as_ref())?;
    let table = transform_table(&raw)?;

    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(artifact_name(Local::now(), request_id));
    xlsx::save_workbook(&table, &path)?;

    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        artifact = %path.display(),
        "report processed"
    );
    Ok(path)
}
