//! Splitting of the compound `Line ID` into site, placement, creative and erid.
//!
//! A line id looks like `<site>_<placement>_<creative>&erid=<code>`, with a
//! few shorter and special-cased forms. Parsing never fails: shapes that are
//! not recognised produce all-null parts.

use arrow::{
    array::{ArrayRef, StringBuilder},
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::report::{
    arrange::dedupe_columns,
    table::{require_column, string_column, text_field},
    LINE_ID,
};

pub const SITE_ID: &str = "Site ID";
pub const PLACEMENT_ID: &str = "Placement ID";
pub const CREATIVE_ID: &str = "Creative ID";
pub const ERID: &str = "Erid";

/// Derived columns, in the order they follow `Line ID`.
pub const LINE_ID_COLUMNS: [&str; 4] = [SITE_ID, PLACEMENT_ID, CREATIVE_ID, ERID];

const ERID_MARKER: &str = "&erid=";
const ADX_PROXY_PREFIX: &str = "_adx_proxy_";
const ADX_PROXY: &str = "adx_proxy";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIdParts {
    pub site_id: Option<String>,
    pub placement_id: Option<String>,
    pub creative_id: Option<String>,
    pub erid: Option<String>,
}

/// Structural shape of a line id once any erid suffix is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineIdShape<'a> {
    /// Only digits (any script); the value stands for site, placement and creative.
    Numeric(&'a str),
    /// `_adx_proxy_..._<creative>`
    AdxProxy { creative_id: &'a str },
    /// No underscore.
    Single(&'a str),
    /// `<site>_<creative>`
    Pair(&'a str, &'a str),
    /// `<site>_<placement>_<creative>`
    Triple(&'a str, &'a str, &'a str),
    /// Four or more segments. Drops the erid as well.
    Unrecognized,
}

impl<'a> LineIdShape<'a> {
    pub fn classify(working: &'a str) -> Self {
        if !working.is_empty() && working.chars().all(char::is_numeric) {
            return Self::Numeric(working);
        }

        if working.starts_with(ADX_PROXY_PREFIX) {
            let creative_id = working.rsplit('_').next().unwrap_or_default();
            return Self::AdxProxy { creative_id };
        }

        let parts: Vec<&str> = working.split('_').collect();
        match parts[..] {
            [one] => Self::Single(one),
            [site, creative] => Self::Pair(site, creative),
            [site, placement, creative] => Self::Triple(site, placement, creative),
            _ => Self::Unrecognized,
        }
    }

    fn into_parts(self, erid: Option<&str>) -> LineIdParts {
        let own = |s: &str| Some(s.to_string());
        let erid = erid.map(str::to_string);

        match self {
            Self::Numeric(digits) => LineIdParts {
                site_id: own(digits),
                placement_id: own(digits),
                creative_id: own(digits),
                erid,
            },
            Self::AdxProxy { creative_id } => LineIdParts {
                site_id: own(ADX_PROXY),
                placement_id: own(ADX_PROXY),
                creative_id: own(creative_id),
                erid,
            },
            Self::Single(site) => LineIdParts {
                site_id: own(site),
                placement_id: own(site),
                creative_id: None,
                erid,
            },
            Self::Pair(site, creative) => LineIdParts {
                site_id: own(site),
                placement_id: own(site),
                creative_id: own(creative),
                erid,
            },
            Self::Triple(site, placement, creative) => LineIdParts {
                site_id: own(site),
                placement_id: own(placement),
                creative_id: own(creative),
                erid,
            },
            // TODO: erid is discarded here even when a suffix was present; confirm with
            // reporting owners whether unrecognised ids should still carry it.
            Self::Unrecognized => LineIdParts::default(),
        }
    }
}

/// Separate the `&erid=` suffix. The erid is the text between the first marker
/// and the next one, if the marker repeats.
pub fn split_erid(raw: &str) -> (&str, Option<&str>) {
    if !raw.contains(ERID_MARKER) {
        return (raw, None);
    }
    let mut pieces = raw.split(ERID_MARKER);
    let working = pieces.next().unwrap_or_default();
    (working, pieces.next())
}

pub fn split_line_id(raw: &str) -> LineIdParts {
    let (working, erid) = split_erid(raw);
    LineIdShape::classify(working).into_parts(erid)
}

/// Append the four derived id columns, replacing any input columns of the same
/// names, then collapse duplicate column names.
pub fn append_line_id_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let ids = string_column(batch, require_column(batch, LINE_ID)?)?;

    let mut builders: [StringBuilder; 4] = Default::default();
    for raw in ids.iter() {
        let parts = split_line_id(raw.unwrap_or_default());
        builders[0].append_option(parts.site_id);
        builders[1].append_option(parts.placement_id);
        builders[2].append_option(parts.creative_id);
        builders[3].append_option(parts.erid);
    }

    let schema = batch.schema();
    let mut fields: Vec<Arc<Field>> = Vec::with_capacity(batch.num_columns() + 4);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns() + 4);
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if LINE_ID_COLUMNS.contains(&field.name().as_str()) {
            debug!(column = %field.name(), "replacing existing id column");
            continue;
        }
        fields.push(field.clone());
        columns.push(column.clone());
    }
    for (name, mut builder) in LINE_ID_COLUMNS.into_iter().zip(builders) {
        fields.push(Arc::new(text_field(name)));
        columns.push(Arc::new(builder.finish()) as ArrayRef);
    }

    let merged = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    dedupe_columns(&merged)
}
