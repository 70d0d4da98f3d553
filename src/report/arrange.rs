use arrow::record_batch::RecordBatch;
use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::report::{
    line_id::LINE_ID_COLUMNS,
    ratio::Metric,
    table::{column_index, column_names, require_column},
    LINE_ID,
};

/// Keep only the first column of each name.
pub fn dedupe_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut seen = HashSet::new();
    let keep: Vec<usize> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| seen.insert(f.name().clone()))
        .map(|(i, _)| i)
        .collect();

    if keep.len() == batch.num_columns() {
        return Ok(batch.clone());
    }
    debug!(
        dropped = batch.num_columns() - keep.len(),
        "dropping duplicate columns"
    );
    Ok(batch.project(&keep)?)
}

/// Column order with the id columns right after `Line ID`, everything else
/// after them in its original order.
fn id_column_order(batch: &RecordBatch) -> Result<Vec<usize>> {
    let line_id = require_column(batch, LINE_ID)?;

    let mut order: Vec<usize> = (0..=line_id).collect();
    for name in LINE_ID_COLUMNS {
        if let Some(idx) = column_index(batch, name) {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }
    }
    let placed: HashSet<usize> = order.iter().copied().collect();
    order.extend((0..batch.num_columns()).filter(|i| !placed.contains(i)));
    Ok(order)
}

/// Move each metric column to sit immediately right of its anchor column.
/// Metrics whose anchor (or own column) is missing stay where they are.
fn splice_metrics(names: &[String], mut order: Vec<usize>) -> Vec<usize> {
    let position = |order: &[usize], name: &str| order.iter().position(|&i| names[i] == name);

    for metric in Metric::ALL {
        let Some(from) = position(&order, metric.column()) else {
            continue;
        };
        if position(&order, metric.anchor()).is_none() {
            continue;
        }
        let idx = order.remove(from);
        if let Some(anchor) = position(&order, metric.anchor()) {
            order.insert(anchor + 1, idx);
        }
    }
    order
}

/// Final report column order.
pub fn arrange_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let batch = dedupe_columns(batch)?;
    let names = column_names(&batch);

    let order = splice_metrics(&names, id_column_order(&batch)?);
    debug!(
        "arranged columns: {:?}",
        order.iter().map(|&i| names[i].as_str()).collect::<Vec<_>>()
    );
    Ok(batch.project(&order)?)
}
