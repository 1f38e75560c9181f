//! Per-event outlier detection: z-score and IQR fences.
//!
//! Both detectors are pure functions of their inputs; no baseline is
//! involved. Channels are tested independently and a row counts as an
//! outlier when any selected channel flags it.

use crate::data::EventTable;
use crate::error::{FlowError, Result};
use crate::stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Which rule produced an outlier report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    Zscore,
    Iqr,
}

/// Per-row outlier flags plus aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    /// Channels that were tested.
    pub channels: Vec<String>,
    /// One flag per row: true when any tested channel flagged it.
    pub flags: Vec<bool>,
    pub n_rows: usize,
    pub n_outliers: usize,
    /// Rows flagged per channel.
    pub per_channel: BTreeMap<String, usize>,
}

impl OutlierReport {
    /// Fraction of rows flagged.
    pub fn outlier_fraction(&self) -> f64 {
        if self.n_rows == 0 {
            0.0
        } else {
            self.n_outliers as f64 / self.n_rows as f64
        }
    }
}

impl std::fmt::Display for OutlierReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Outlier Report ({})",
            match self.method {
                OutlierMethod::Zscore => "z-score",
                OutlierMethod::Iqr => "IQR",
            }
        )?;
        writeln!(f, "  Rows:     {}", self.n_rows)?;
        writeln!(
            f,
            "  Outliers: {} ({:.2}%)",
            self.n_outliers,
            self.outlier_fraction() * 100.0
        )?;
        for (channel, count) in &self.per_channel {
            writeln!(f, "    {}: {}", channel, count)?;
        }
        Ok(())
    }
}

/// Flag rows whose value lies more than `threshold` standard deviations
/// from the channel mean.
///
/// Rows with a missing value in a channel are excluded from that channel's
/// test. A zero-std channel flags nothing.
pub fn detect_outliers_zscore(
    table: &EventTable,
    channels: &[String],
    threshold: f64,
) -> Result<OutlierReport> {
    validate(table, channels)?;
    if !(threshold > 0.0) {
        return Err(FlowError::InvalidParameter(
            "Z-score threshold must be positive".to_string(),
        ));
    }

    detect_with(table, channels, OutlierMethod::Zscore, |values| {
        let finite = stats::finite_values(values);
        let mean = stats::mean(&finite);
        let std = stats::std_dev(&finite);
        if !(std > 0.0) {
            warn!("zero standard deviation, no z-score outliers flagged");
            return Box::new(|_| false);
        }
        Box::new(move |v| (v - mean).abs() / std > threshold)
    })
}

/// Flag rows whose value lies outside `[Q25 - factor*IQR, Q75 + factor*IQR]`.
///
/// Rows with a missing value in a channel are excluded from that channel's
/// test.
pub fn detect_outliers_iqr(
    table: &EventTable,
    channels: &[String],
    factor: f64,
) -> Result<OutlierReport> {
    validate(table, channels)?;
    if !(factor > 0.0) {
        return Err(FlowError::InvalidParameter(
            "IQR factor must be positive".to_string(),
        ));
    }

    detect_with(table, channels, OutlierMethod::Iqr, |values| {
        let finite = stats::finite_values(values);
        let q25 = stats::quantile(&finite, 0.25);
        let q75 = stats::quantile(&finite, 0.75);
        let fence = factor * (q75 - q25);
        let lower = q25 - fence;
        let upper = q75 + fence;
        Box::new(move |v| v < lower || v > upper)
    })
}

fn validate(table: &EventTable, channels: &[String]) -> Result<()> {
    if table.is_empty() {
        return Err(FlowError::EmptyData(
            "Cannot detect outliers in an empty table".to_string(),
        ));
    }
    if channels.is_empty() {
        return Err(FlowError::InvalidParameter(
            "No channels selected for outlier detection".to_string(),
        ));
    }
    table.require_channels(channels)
}

/// Shared per-channel sweep: `rule` fits a channel and returns its row test.
fn detect_with(
    table: &EventTable,
    channels: &[String],
    method: OutlierMethod,
    rule: impl Fn(&[f64]) -> Box<dyn Fn(f64) -> bool>,
) -> Result<OutlierReport> {
    let mut flags = vec![false; table.n_rows()];
    let mut per_channel = BTreeMap::new();

    for name in channels {
        let values = table.require_channel(name)?;
        let test = rule(values);
        let mut count = 0usize;
        for (row, &v) in values.iter().enumerate() {
            if v.is_finite() && test(v) {
                flags[row] = true;
                count += 1;
            }
        }
        per_channel.insert(name.clone(), count);
    }

    let n_outliers = flags.iter().filter(|&&f| f).count();
    Ok(OutlierReport {
        method,
        channels: channels.to_vec(),
        flags,
        n_rows: table.n_rows(),
        n_outliers,
        per_channel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_channel(values: Vec<f64>) -> (EventTable, Vec<String>) {
        let table =
            EventTable::from_columns(vec![("FSC-A".to_string(), values)]).unwrap();
        (table, vec!["FSC-A".to_string()])
    }

    #[test]
    fn test_iqr_flags_gross_outlier() {
        let (table, channels) = single_channel(vec![1.0, 2.0, 3.0, 4.0, 100.0]);
        let report = detect_outliers_iqr(&table, &channels, 1.5).unwrap();
        // Q25 = 2, Q75 = 4, fences [-1, 7]: only 100 lies outside.
        assert_eq!(report.flags, vec![false, false, false, false, true]);
        assert_eq!(report.n_outliers, 1);
        assert_eq!(report.per_channel["FSC-A"], 1);
    }

    #[test]
    fn test_zscore_flags_gross_outlier() {
        let (table, channels) = single_channel(vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        let report = detect_outliers_zscore(&table, &channels, 2.0).unwrap();
        assert_eq!(
            report.flags,
            vec![false, false, false, false, false, true]
        );
        assert_eq!(report.n_outliers, 1);
    }

    #[test]
    fn test_zscore_no_outliers_in_uniform_data() {
        let (table, channels) = single_channel(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let report = detect_outliers_zscore(&table, &channels, 2.0).unwrap();
        assert_eq!(report.n_outliers, 0);
    }

    #[test]
    fn test_any_channel_flags_row() {
        let table = EventTable::from_columns(vec![
            ("FSC-A".to_string(), vec![1.0, 2.0, 3.0, 4.0, 3.0]),
            ("SSC-A".to_string(), vec![1.0, 2.0, 3.0, 4.0, 100.0]),
        ])
        .unwrap();
        let channels = vec!["FSC-A".to_string(), "SSC-A".to_string()];
        let report = detect_outliers_iqr(&table, &channels, 1.5).unwrap();
        assert!(report.flags[4]);
        assert_eq!(report.per_channel["FSC-A"], 0);
        assert_eq!(report.per_channel["SSC-A"], 1);
    }

    #[test]
    fn test_missing_values_excluded() {
        let (table, channels) =
            single_channel(vec![1.0, 2.0, f64::NAN, 4.0, 100.0]);
        let report = detect_outliers_iqr(&table, &channels, 1.5).unwrap();
        // The NaN row is never flagged; stats come from the finite values.
        assert!(!report.flags[2]);
        assert!(report.flags[4]);
    }

    #[test]
    fn test_zero_std_flags_nothing() {
        let (table, channels) = single_channel(vec![5.0; 8]);
        let report = detect_outliers_zscore(&table, &channels, 2.0).unwrap();
        assert_eq!(report.n_outliers, 0);
    }

    #[test]
    fn test_validation_errors() {
        let (table, channels) = single_channel(vec![1.0, 2.0]);
        assert!(matches!(
            detect_outliers_zscore(&table, &[], 2.0),
            Err(FlowError::InvalidParameter(_))
        ));
        assert!(matches!(
            detect_outliers_zscore(&table, &channels, 0.0),
            Err(FlowError::InvalidParameter(_))
        ));
        assert!(matches!(
            detect_outliers_iqr(&table, &["FL1-A".to_string()], 1.5),
            Err(FlowError::MissingChannel(_))
        ));

        let empty = EventTable::from_columns(vec![("FSC-A".to_string(), Vec::new())]).unwrap();
        assert!(matches!(
            detect_outliers_iqr(&empty, &channels, 1.5),
            Err(FlowError::EmptyData(_))
        ));
    }

    #[test]
    fn test_outlier_fraction() {
        let (table, channels) = single_channel(vec![1.0, 2.0, 3.0, 4.0, 100.0]);
        let report = detect_outliers_iqr(&table, &channels, 1.5).unwrap();
        assert!((report.outlier_fraction() - 0.2).abs() < 1e-12);
    }
}
