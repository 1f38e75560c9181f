//! Scatter-shift detection against a baselined reference sample.

use crate::data::EventTable;
use crate::error::{FlowError, Result};
use crate::stats;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::{info, warn};

/// Per-channel mean and standard deviation of the reference sample.
///
/// Owned by exactly one detector; re-baselining overwrites, never merges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineStats {
    pub x_channel: String,
    pub y_channel: String,
    pub x_mean: f64,
    pub x_std: f64,
    pub y_mean: f64,
    pub y_std: f64,
    /// Events the baseline was computed from.
    pub n_events: usize,
}

/// Result of comparing a test sample against the baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftReport {
    /// Mean shift on the x channel, in baseline standard deviations.
    pub x_shift: f64,
    /// Mean shift on the y channel, in baseline standard deviations.
    pub y_shift: f64,
    /// Euclidean norm of the two shifts.
    pub magnitude: f64,
    /// Threshold the magnitude was compared against.
    pub threshold: f64,
    /// True when the magnitude exceeds the threshold.
    pub is_anomaly: bool,
    /// Tail probability of the squared magnitude under a chi-squared
    /// distribution with 2 degrees of freedom.
    pub p_value: f64,
    /// Events in the test sample.
    pub n_events: usize,
}

/// Detects distribution shifts of a two-channel scatter view.
///
/// Lifecycle: uninitialized, then baselined via [`set_baseline`], then
/// tested any number of times via [`detect_scatter_shift`]. Testing never
/// mutates the baseline.
///
/// [`set_baseline`]: ShiftDetector::set_baseline
/// [`detect_scatter_shift`]: ShiftDetector::detect_scatter_shift
#[derive(Debug, Clone, Default)]
pub struct ShiftDetector {
    baseline: Option<BaselineStats>,
}

impl ShiftDetector {
    /// Detector with no baseline set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current baseline, if one has been set.
    pub fn baseline(&self) -> Option<&BaselineStats> {
        self.baseline.as_ref()
    }

    /// Compute and store baseline statistics for two channels.
    ///
    /// Fails if either channel is absent or the table is empty. Replaces
    /// any previous baseline.
    pub fn set_baseline(
        &mut self,
        table: &EventTable,
        x_channel: &str,
        y_channel: &str,
    ) -> Result<&BaselineStats> {
        if table.is_empty() {
            return Err(FlowError::EmptyData(
                "Baseline table has no events".to_string(),
            ));
        }
        let x = stats::finite_values(table.require_channel(x_channel)?);
        let y = stats::finite_values(table.require_channel(y_channel)?);
        if x.is_empty() || y.is_empty() {
            return Err(FlowError::EmptyData(format!(
                "No finite values in '{}'/'{}'",
                x_channel, y_channel
            )));
        }

        let baseline = BaselineStats {
            x_channel: x_channel.to_string(),
            y_channel: y_channel.to_string(),
            x_mean: stats::mean(&x),
            x_std: stats::std_dev(&x),
            y_mean: stats::mean(&y),
            y_std: stats::std_dev(&y),
            n_events: table.n_rows(),
        };
        info!(
            x_channel,
            y_channel,
            n_events = baseline.n_events,
            "baseline set"
        );
        self.baseline = Some(baseline);
        Ok(self.baseline.as_ref().unwrap())
    }

    /// Compare a test sample's channel means against the baseline.
    ///
    /// The per-channel shift is `(test_mean - baseline_mean) / baseline_std`.
    /// A zero baseline std yields a shift of 0 when the means agree and an
    /// unbounded (infinite) shift otherwise, which flags as anomalous for
    /// any finite threshold.
    pub fn detect_scatter_shift(&self, test: &EventTable, threshold: f64) -> Result<ShiftReport> {
        let baseline = self.baseline.as_ref().ok_or_else(|| {
            FlowError::NoBaseline("call set_baseline before detect_scatter_shift".to_string())
        })?;
        if test.is_empty() {
            return Err(FlowError::EmptyData("Test table has no events".to_string()));
        }
        if !(threshold > 0.0) {
            return Err(FlowError::InvalidParameter(
                "Shift threshold must be positive".to_string(),
            ));
        }

        let x = stats::finite_values(test.require_channel(&baseline.x_channel)?);
        let y = stats::finite_values(test.require_channel(&baseline.y_channel)?);
        let x_shift = mean_shift(stats::mean(&x), baseline.x_mean, baseline.x_std);
        let y_shift = mean_shift(stats::mean(&y), baseline.y_mean, baseline.y_std);

        let magnitude = x_shift.hypot(y_shift);
        let is_anomaly = magnitude > threshold;
        if is_anomaly {
            warn!(
                magnitude,
                threshold, "scatter distribution shifted from baseline"
            );
        }

        let chi2 = ChiSquared::new(2.0).unwrap();
        let p_value = if magnitude.is_infinite() {
            0.0
        } else {
            1.0 - chi2.cdf(magnitude * magnitude)
        };

        Ok(ShiftReport {
            x_shift,
            y_shift,
            magnitude,
            threshold,
            is_anomaly,
            p_value,
            n_events: test.n_rows(),
        })
    }
}

fn mean_shift(test_mean: f64, baseline_mean: f64, baseline_std: f64) -> f64 {
    let diff = test_mean - baseline_mean;
    if baseline_std == 0.0 {
        if diff == 0.0 {
            0.0
        } else {
            diff.signum() * f64::INFINITY
        }
    } else {
        diff / baseline_std
    }
}
