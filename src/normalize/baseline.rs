//! Fold-change normalization against designated baseline/control samples.

use crate::data::{plottable_channels, EventTable};
use crate::error::Result;
use crate::stats;
use tracing::{info, warn};

/// Suffix for the fold-change column derived from a value column.
pub const FOLD_CHANGE_SUFFIX: &str = "_fold_change";
/// Suffix for the log2 fold-change column.
pub const LOG2FC_SUFFIX: &str = "_log2fc";

/// Normalize values relative to the mean of baseline samples.
///
/// Rows whose sample id is in `baseline_samples` define the baseline; every
/// value column gains `{name}_fold_change = value / baseline_mean` and
/// `{name}_log2fc = log2(fold_change)` siblings. When the baseline mean of a
/// column is zero the fold-change is pinned to 1.0 and the log2 column is
/// skipped, avoiding a logarithm domain error.
///
/// If no rows match the baseline ids the input is returned unchanged with a
/// warning. `columns = None` selects every non-identifier channel.
pub fn normalize_to_baseline<S: AsRef<str>>(
    table: &EventTable,
    baseline_samples: &[S],
    columns: Option<&[String]>,
) -> Result<EventTable> {
    let baseline_rows = table.rows_for_samples(baseline_samples)?;
    if baseline_rows.is_empty() {
        warn!("no baseline samples found, skipping baseline normalization");
        return Ok(table.clone());
    }

    let selected: Vec<String> = match columns {
        Some(cols) => {
            table.require_channels(cols)?;
            cols.to_vec()
        }
        None => plottable_channels(table),
    };
    if selected.is_empty() {
        warn!("no numeric columns to normalize");
        return Ok(table.clone());
    }

    let mut out = table.clone();
    for name in &selected {
        let values = table.require_channel(name)?;
        let baseline: Vec<f64> = baseline_rows.iter().map(|&i| values[i]).collect();
        let baseline_mean = stats::mean(&stats::finite_values(&baseline));

        if baseline_mean == 0.0 || baseline_mean.is_nan() {
            warn!(channel = name.as_str(), "zero baseline mean, using fold-change = 1");
            out = out.with_channel(
                &format!("{}{}", name, FOLD_CHANGE_SUFFIX),
                vec![1.0; table.n_rows()],
            )?;
            continue;
        }

        let fold: Vec<f64> = values.iter().map(|v| v / baseline_mean).collect();
        let log2fc: Vec<f64> = fold.iter().map(|f| f.log2()).collect();
        out = out.with_channel(&format!("{}{}", name, FOLD_CHANGE_SUFFIX), fold)?;
        out = out.with_channel(&format!("{}{}", name, LOG2FC_SUFFIX), log2fc)?;
    }

    info!(
        n_columns = selected.len(),
        n_baseline_rows = baseline_rows.len(),
        "baseline normalization complete"
    );
    Ok(out)
}
