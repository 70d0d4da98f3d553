//! Error types for report processing

use arrow::error::ArrowError;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Wrong extension, missing header row or a CSV body that does not parse.
    #[error("Invalid input: {reason}")]
    InputFormat { reason: String },

    #[error("Required column missing: {column}")]
    MissingColumn { column: String },

    #[error("Column {column} is not a text column")]
    ColumnType { column: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub fn input_format(reason: impl Into<String>) -> Self {
        Self::InputFormat {
            reason: reason.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// True for errors caused by what the caller sent rather than by the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InputFormat { .. } | Self::MissingColumn { .. } | Self::ColumnType { .. }
        )
    }
}
