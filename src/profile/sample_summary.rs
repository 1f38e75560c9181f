//! Per-sample summary tables: one row per sample, aggregate columns per
//! channel.
//!
//! This is the statistics-table shape that downstream normalization and
//! reporting consume: `FSC-A_mean`, `FSC-A_median`, `FSC-A_std`, ... plus an
//! `event_count` column.

use crate::data::{plottable_channels, EventTable};
use crate::error::{FlowError, Result};
use crate::stats;
use std::collections::HashMap;

/// Collapse an event table into a per-sample summary table.
///
/// Samples appear in first-occurrence order; each plottable channel
/// contributes `{name}_mean`, `{name}_median`, and `{name}_std` columns
/// computed over that sample's finite values.
pub fn summarize_by_sample(table: &EventTable) -> Result<EventTable> {
    let ids = table.require_sample_ids("per-sample summary")?;
    if table.is_empty() {
        return Err(FlowError::EmptyData(
            "Cannot summarize an empty table".to_string(),
        ));
    }

    // Sample ids in first-occurrence order, with their row indices.
    let mut order: Vec<String> = Vec::new();
    let mut rows_by_sample: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, id) in ids.iter().enumerate() {
        let entry = rows_by_sample.entry(id.as_str()).or_insert_with(|| {
            order.push(id.clone());
            Vec::new()
        });
        entry.push(row);
    }

    let channels = plottable_channels(table);
    if channels.is_empty() {
        return Err(FlowError::EmptyData(
            "No channels to summarize".to_string(),
        ));
    }

    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
    columns.push((
        "event_count".to_string(),
        order
            .iter()
            .map(|id| rows_by_sample[id.as_str()].len() as f64)
            .collect(),
    ));

    for name in &channels {
        let values = table.channel(name).expect("plottable channel");
        let mut means = Vec::with_capacity(order.len());
        let mut medians = Vec::with_capacity(order.len());
        let mut stds = Vec::with_capacity(order.len());
        for id in &order {
            let sample: Vec<f64> = rows_by_sample[id.as_str()]
                .iter()
                .map(|&row| values[row])
                .filter(|v| v.is_finite())
                .collect();
            means.push(stats::mean(&sample));
            medians.push(stats::median(&sample));
            stds.push(stats::std_dev(&sample));
        }
        columns.push((format!("{}_mean", name), means));
        columns.push((format!("{}_median", name), medians));
        columns.push((format!("{}_std", name), stds));
    }

    EventTable::from_columns(columns)?.with_sample_ids(order)
}
