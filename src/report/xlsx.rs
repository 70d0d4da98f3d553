use arrow::{
    array::{Array, StringArray},
    record_batch::RecordBatch,
};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::{io::Write, path::Path};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::report::{
    line_id::LINE_ID_COLUMNS,
    ratio::Metric,
    table::{column_index, parse_number, string_column},
    threshold::{classify_cell, Band},
    LINE_ID, PLACEMENT_TYPE,
};

pub const SHEET_NAME: &str = "Sheet1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    /// Input column; numeric-looking text is written as a number.
    Passthrough,
    /// `Line ID` and the id columns derived from it, always text.
    Text,
    Metric(Metric),
}

/// A highlighted cell, zero-based in table coordinates (header excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBand {
    pub row: usize,
    pub column: usize,
    pub band: Band,
}

struct SheetLayout<'a> {
    columns: Vec<(&'a StringArray, CellKind)>,
    placement: Option<&'a StringArray>,
}

impl<'a> SheetLayout<'a> {
    fn new(batch: &'a RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let mut columns = Vec::with_capacity(batch.num_columns());
        for (idx, field) in schema.fields().iter().enumerate() {
            let name = field.name().as_str();
            let kind = if let Some(metric) = Metric::from_column(name) {
                CellKind::Metric(metric)
            } else if name == LINE_ID || LINE_ID_COLUMNS.contains(&name) {
                CellKind::Text
            } else {
                CellKind::Passthrough
            };
            columns.push((string_column(batch, idx)?, kind));
        }

        let placement = match column_index(batch, PLACEMENT_TYPE) {
            Some(idx) => Some(string_column(batch, idx)?),
            None => {
                debug!("no {} column, cells stay unhighlighted", PLACEMENT_TYPE);
                None
            }
        };

        Ok(Self { columns, placement })
    }

    fn band(&self, row: usize, column: usize) -> Option<Band> {
        let (values, kind) = self.columns[column];
        let CellKind::Metric(metric) = kind else {
            return None;
        };
        let placement = self.placement?;
        if values.is_null(row) || placement.is_null(row) {
            return None;
        }
        classify_cell(Some(placement.value(row)), metric, values.value(row))
    }
}

/// Every metric cell that receives a fill.
pub fn classify_cells(batch: &RecordBatch) -> Result<Vec<CellBand>> {
    let layout = SheetLayout::new(batch)?;
    let mut out = Vec::new();
    for row in 0..batch.num_rows() {
        for column in 0..batch.num_columns() {
            if let Some(band) = layout.band(row, column) {
                out.push(CellBand { row, column, band });
            }
        }
    }
    Ok(out)
}

fn sheet_row(row: usize) -> Result<u32> {
    u32::try_from(row + 1).map_err(|_| ReportError::input_format("too many rows for a worksheet"))
}

fn sheet_col(column: usize) -> Result<u16> {
    u16::try_from(column)
        .map_err(|_| ReportError::input_format("too many columns for a worksheet"))
}

fn write_rows(sheet: &mut Worksheet, batch: &RecordBatch) -> Result<usize> {
    let layout = SheetLayout::new(batch)?;
    let header = Format::new().set_bold();
    let green = Format::new().set_background_color(Band::Green.fill_color());
    let yellow = Format::new().set_background_color(Band::Yellow.fill_color());
    let red = Format::new().set_background_color(Band::Red.fill_color());
    let fill_for = |band: Band| match band {
        Band::Green => &green,
        Band::Yellow => &yellow,
        Band::Red => &red,
    };

    for (column, field) in batch.schema().fields().iter().enumerate() {
        sheet.write_string_with_format(0, sheet_col(column)?, field.name(), &header)?;
    }

    let mut highlighted = 0;
    for row in 0..batch.num_rows() {
        let r = sheet_row(row)?;
        for (column, (values, kind)) in layout.columns.iter().enumerate() {
            if values.is_null(row) {
                continue;
            }
            let c = sheet_col(column)?;
            let value = values.value(row);
            match kind {
                CellKind::Metric(_) => match layout.band(row, column).map(fill_for) {
                    Some(format) => {
                        sheet.write_string_with_format(r, c, value, format)?;
                        highlighted += 1;
                    }
                    None => {
                        sheet.write_string(r, c, value)?;
                    }
                },
                CellKind::Text => {
                    sheet.write_string(r, c, value)?;
                }
                CellKind::Passthrough => match parse_number(value) {
                    Some(n) => {
                        sheet.write_number(r, c, n)?;
                    }
                    None => {
                        sheet.write_string(r, c, value)?;
                    }
                },
            }
        }
    }
    Ok(highlighted)
}

/// Single-sheet workbook: bold header row, one row per table row, metric cells filled by band.
pub fn build_workbook(batch: &RecordBatch) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    let highlighted = write_rows(sheet, batch)?;
    debug!(highlighted, rows = batch.num_rows(), "rendered worksheet");
    Ok(workbook)
}

pub fn workbook_bytes(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(batch)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write the workbook to `path` atomically: nothing appears at `path` unless
/// the whole file was written.
#[tracing::instrument(level = "info", skip(batch, path), fields(path = %path.as_ref().display()))]
pub fn save_workbook<P: AsRef<Path>>(batch: &RecordBatch, path: P) -> Result<u64> {
    let path = path.as_ref();
    let bytes = workbook_bytes(batch)?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(bytes = bytes.len(), "wrote workbook");
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::table::batch_from_rows;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn sample() -> RecordBatch {
        batch_from_rows(
            &["Line ID", "Site ID", "Impressions (Gross)", "Imps GIVT, %", "Placement Type"],
            &[
                &[Some("12"), Some("12"), Some("200"), Some("0.50%"), Some("In-Banner")],
                &[Some("A_B"), Some("A"), None, Some("nan%"), Some("In-Banner")],
                &[Some("C"), Some("C"), Some("10"), Some("5.00%"), Some("Native")],
            ],
        )
    }

    #[test]
    fn test_classify_cells_skips_sentinel_and_unknown_placement() {
        let cells = classify_cells(&sample()).unwrap();
        assert_eq!(
            cells,
            vec![CellBand {
                row: 0,
                column: 3,
                band: Band::Green
            }]
        );
    }

    #[test]
    fn test_no_placement_column_means_no_bands() {
        let batch = batch_from_rows(&["Line ID", "Imps GIVT, %"], &[&[Some("1"), Some("9.00%")]]);
        assert!(classify_cells(&batch).unwrap().is_empty());
    }

    #[test]
    fn test_workbook_values_round_trip() {
        let bytes = workbook_bytes(&sample()).unwrap();
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(wb.sheet_names(), vec![SHEET_NAME.to_string()]);
        let range = wb.worksheet_range(SHEET_NAME).unwrap();

        assert_eq!(range.get_size(), (4, 5));
        assert_eq!(range.get((0, 3)), Some(&Data::String("Imps GIVT, %".into())));
        // passthrough numbers become numbers, ids stay text
        assert_eq!(range.get((1, 0)), Some(&Data::String("12".into())));
        assert_eq!(range.get((1, 1)), Some(&Data::String("12".into())));
        assert_eq!(range.get((1, 2)), Some(&Data::Float(200.0)));
        assert_eq!(range.get((2, 2)), Some(&Data::Empty));
        assert_eq!(range.get((2, 3)), Some(&Data::String("nan%".into())));
    }

    #[test]
    fn test_line_id_keeps_original_text() {
        let batch = batch_from_rows(
            &["Line ID", "Site ID", "Clicks (Gross)"],
            &[
                &[Some("000123"), Some("000123"), Some("007")],
                &[Some("12345678901234567890"), Some("12345678901234567890"), Some("1")],
            ],
        );
        let bytes = workbook_bytes(&batch).unwrap();
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = wb.worksheet_range(SHEET_NAME).unwrap();

        assert_eq!(range.get((1, 0)), Some(&Data::String("000123".into())));
        assert_eq!(range.get((1, 1)), Some(&Data::String("000123".into())));
        assert_eq!(
            range.get((2, 0)),
            Some(&Data::String("12345678901234567890".into()))
        );
        assert_eq!(range.get((1, 2)), Some(&Data::Float(7.0)));
    }

    #[test]
    fn test_save_workbook_writes_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("report.xlsx");
        let written = save_workbook(&sample(), &path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), written);
        // only the final file remains
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
