//! Upload-and-download boundary.
//!
//! An HTTP layer (or the CLI) hands over the uploaded bytes plus the declared
//! file name and gets back either the finished workbook or a rejection that
//! maps onto a status code and a JSON error body.

use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::report;

pub const ACCEPTED_EXTENSION: &str = ".csv";

#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    /// File name as declared by the client.
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Debug)]
pub struct Download {
    /// Suggested attachment name.
    pub filename: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    #[serde(skip)]
    pub status: u16,
    pub error: String,
}

impl Rejection {
    pub fn body(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&ReportError> for Rejection {
    fn from(err: &ReportError) -> Self {
        let status = match err {
            ReportError::InputFormat { .. } => 400,
            ReportError::MissingColumn { .. } | ReportError::ColumnType { .. } => 422,
            _ => 500,
        };
        let error = match err {
            ReportError::InputFormat { .. } => {
                format!("Invalid file format. Please upload a CSV file. ({})", err)
            }
            _ => err.to_string(),
        };
        Rejection { status, error }
    }
}

/// Reject anything not declared as `.csv`.
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.ends_with(ACCEPTED_EXTENSION) {
        Ok(())
    } else {
        Err(ReportError::input_format(format!(
            "{:?} is not a {} file",
            filename, ACCEPTED_EXTENSION
        )))
    }
}

/// Final path component of the client's name, prefixed with the request id.
fn upload_path(upload_dir: &Path, filename: &str, request_id: &str) -> PathBuf {
    let base = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.csv".to_string());
    upload_dir.join(format!("{}_{}", request_id, base))
}

/// Save the upload, build the report into the output directory and return
/// the artifact. The saved upload is removed afterwards either way.
#[tracing::instrument(level = "info", skip(config, upload), fields(filename = %upload.filename, bytes = upload.bytes.len()))]
pub fn process_upload(config: &ReportConfig, upload: Upload<'_>, request_id: &str) -> Result<Download> {
    validate_filename(upload.filename)?;
    config.ensure_dirs()?;

    let input = upload_path(config.upload_dir(), upload.filename, request_id);
    fs::write(&input, upload.bytes)?;

    let outcome = report::process_file(&input, config.output_dir(), request_id);
    if let Err(e) = fs::remove_file(&input) {
        warn!("failed to delete upload {}: {}", input.display(), e);
    }

    let path = outcome?;
    let bytes = fs::read(&path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    info!(artifact = %filename, "upload processed");
    Ok(Download {
        filename,
        path,
        bytes,
    })
}

/// [`process_upload`] with errors turned into a client-facing rejection.
pub fn handle_upload(
    config: &ReportConfig,
    upload: Upload<'_>,
    request_id: &str,
) -> std::result::Result<Download, Rejection> {
    process_upload(config, upload, request_id).map_err(|e| {
        let rejection = Rejection::from(&e);
        warn!(status = rejection.status, "rejected upload {}: {}", upload.filename, e);
        rejection
    })
}
