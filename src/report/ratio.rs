use arrow::{array::StringArray, record_batch::RecordBatch};
use tracing::debug;

use crate::error::Result;
use crate::report::table::{parse_number, require_column, string_column, upsert_column};

/// Rendered in place of a percentage when it cannot be computed.
pub const UNDEFINED_RATIO: &str = "nan%";

/// Quality ratios derived from the raw counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    ImpsGivt,
    ClicksGivt,
    Viewability,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::ImpsGivt, Metric::ClicksGivt, Metric::Viewability];

    /// Header of the derived column.
    pub fn column(self) -> &'static str {
        match self {
            Metric::ImpsGivt => "Imps GIVT, %",
            Metric::ClicksGivt => "Clicks GIVT, %",
            Metric::Viewability => "Viewability, %",
        }
    }

    pub fn numerator(self) -> &'static str {
        match self {
            Metric::ImpsGivt => "Impressions (GIVT)",
            Metric::ClicksGivt => "Clicks (GIVT)",
            Metric::Viewability => "Viewable Impression",
        }
    }

    pub fn denominator(self) -> &'static str {
        match self {
            Metric::ImpsGivt => "Impressions (Gross)",
            Metric::ClicksGivt => "Clicks (Gross)",
            Metric::Viewability => "Recordable Impression",
        }
    }

    /// The derived column is placed directly after this one.
    pub fn anchor(self) -> &'static str {
        match self {
            Metric::ImpsGivt => "Impressions (Gross)",
            Metric::ClicksGivt => "Clicks (Gross)",
            Metric::Viewability => "Viewable Impression",
        }
    }

    pub fn from_column(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.column() == name)
    }
}

/// `numerator / denominator * 100`, rounded to two places, ties to even.
pub fn ratio_percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => {
            let pct = n / d * 100.0;
            pct.is_finite().then(|| (pct * 100.0).round_ties_even() / 100.0)
        }
        _ => None,
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => UNDEFINED_RATIO.to_string(),
    }
}

/// Inverse of [`format_percent`]; the sentinel and anything non-numeric give `None`.
pub fn parse_percent(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell == UNDEFINED_RATIO {
        return None;
    }
    cell.strip_suffix('%')
        .unwrap_or(cell)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn ratio_cell(numerator: Option<&str>, denominator: Option<&str>) -> String {
    format_percent(ratio_percent(
        numerator.and_then(parse_number),
        denominator.and_then(parse_number),
    ))
}

fn compute_metric(batch: &RecordBatch, metric: Metric) -> Result<StringArray> {
    let num = string_column(batch, require_column(batch, metric.numerator())?)?;
    let den = string_column(batch, require_column(batch, metric.denominator())?)?;

    Ok(num
        .iter()
        .zip(den.iter())
        .map(|(n, d)| Some(ratio_cell(n, d)))
        .collect())
}

/// Add the three percentage columns. Every source column must be present.
pub fn append_ratio_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut out = batch.clone();
    for metric in Metric::ALL {
        let values = compute_metric(&out, metric)?;
        let undefined = values
            .iter()
            .filter(|v| *v == Some(UNDEFINED_RATIO))
            .count();
        debug!(metric = metric.column(), undefined, "computed ratio column");
        out = upsert_column(&out, metric.column(), values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::report::table::{batch_from_rows, column_names};

    #[test]
    fn test_ratio_cell() {
        assert_eq!(ratio_cell(Some("5"), Some("200")), "2.50%");
        assert_eq!(ratio_cell(Some("1"), Some("3")), "33.33%");
        assert_eq!(ratio_cell(Some("2"), Some("3")), "66.67%");
        assert_eq!(ratio_cell(Some("0"), Some("10")), "0.00%");
        assert_eq!(ratio_cell(Some("5"), Some("0")), "nan%");
        assert_eq!(ratio_cell(Some("5"), None), "nan%");
        assert_eq!(ratio_cell(None, Some("200")), "nan%");
        assert_eq!(ratio_cell(Some("abc"), Some("200")), "nan%");
    }

    #[test]
    fn test_ratio_ties_round_to_even() {
        assert_eq!(ratio_cell(Some("1"), Some("800")), "0.12%");
        assert_eq!(ratio_cell(Some("9"), Some("800")), "1.12%");
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("2.50%"), Some(2.5));
        assert_eq!(parse_percent("100.00%"), Some(100.0));
        assert_eq!(parse_percent("nan%"), None);
        assert_eq!(parse_percent("inf%"), None);
        assert_eq!(parse_percent(""), None);
    }

    #[test]
    fn test_metric_lookup() {
        assert_eq!(Metric::from_column("Viewability, %"), Some(Metric::Viewability));
        assert_eq!(Metric::from_column("Viewability"), None);
    }

    fn counters() -> Vec<&'static str> {
        vec![
            "Impressions (GIVT)",
            "Impressions (Gross)",
            "Clicks (GIVT)",
            "Clicks (Gross)",
            "Viewable Impression",
            "Recordable Impression",
        ]
    }

    #[test]
    fn test_append_ratio_columns() {
        let batch = batch_from_rows(
            &counters(),
            &[
                &[Some("5"), Some("200"), Some("1"), Some("4"), Some("90"), Some("100")],
                &[Some("1"), Some("0"), None, Some("4"), Some("3"), None],
            ],
        );
        let out = append_ratio_columns(&batch).unwrap();
        let names = column_names(&out);
        assert_eq!(&names[6..], &["Imps GIVT, %", "Clicks GIVT, %", "Viewability, %"]);

        let imps = string_column(&out, 6).unwrap();
        let clicks = string_column(&out, 7).unwrap();
        let view = string_column(&out, 8).unwrap();
        assert_eq!(imps.value(0), "2.50%");
        assert_eq!(clicks.value(0), "25.00%");
        assert_eq!(view.value(0), "90.00%");
        assert_eq!(imps.value(1), "nan%");
        assert_eq!(clicks.value(1), "nan%");
        assert_eq!(view.value(1), "nan%");
    }

    #[test]
    fn test_missing_source_column_is_fatal() {
        let headers: Vec<&str> = counters()
            .into_iter()
            .filter(|h| *h != "Recordable Impression")
            .collect();
        let batch = batch_from_rows(&headers, &[]);
        match append_ratio_columns(&batch) {
            Err(ReportError::MissingColumn { column }) => {
                assert_eq!(column, "Recordable Impression")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
