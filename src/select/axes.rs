//! Auto-axis selection: rank channel pairs worth plotting.
//!
//! A cytometer produces dozens of channels, so the space of candidate
//! scatter-plot axes is quadratic. The selector scores every pair of
//! informative channels and keeps the few that balance spread (variance)
//! against redundancy (inter-channel correlation).

use crate::data::{classify, plottable_channels, ChannelClass, EventTable};
use crate::error::Result;
use crate::stats;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Bonus multiplier for pairs that cross the scatter/fluorescence divide.
const CROSS_CLASS_BONUS: f64 = 1.25;

/// Simple LCG random number generator for reproducible subsampling.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    /// Shuffle a vector in place.
    fn shuffle<T>(&mut self, vec: &mut [T]) {
        for i in (1..vec.len()).rev() {
            let j = (self.next_u64() as usize) % (i + 1);
            vec.swap(i, j);
        }
    }
}

/// A ranked channel-pair recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisRecommendation {
    pub x_channel: String,
    pub y_channel: String,
    pub score: f64,
    pub reason: String,
}

/// Scores channel pairs and returns the best candidates for plotting.
#[derive(Debug, Clone)]
pub struct AxisSelector {
    /// Minimum variance of the min-max-scaled channel; near-constant
    /// channels below this are uninformative.
    pub min_variance: f64,
    /// Pairs whose absolute Pearson correlation exceeds this are redundant.
    pub max_correlation: f64,
    /// Rows used for scoring; larger tables are subsampled to this size.
    pub sample_size: usize,
    /// Seed for the deterministic subsample.
    pub seed: u64,
}

impl Default for AxisSelector {
    fn default() -> Self {
        Self {
            min_variance: 0.01,
            max_correlation: 0.95,
            sample_size: 10_000,
            seed: 42,
        }
    }
}

impl AxisSelector {
    /// Selector with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the variance floor.
    pub fn with_min_variance(mut self, min_variance: f64) -> Self {
        self.min_variance = min_variance;
        self
    }

    /// Set the correlation ceiling.
    pub fn with_max_correlation(mut self, max_correlation: f64) -> Self {
        self.max_correlation = max_correlation;
        self
    }

    /// Set the scoring subsample size.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Set the subsample seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Rank channel pairs and return at most `n` recommendations.
    ///
    /// Fewer than two informative channels yield an empty list; when fewer
    /// pairs survive the variance/correlation screens than requested, only
    /// the survivors are returned.
    pub fn recommend(&self, table: &EventTable, n: usize) -> Result<Vec<AxisRecommendation>> {
        let names = plottable_channels(table);
        if names.len() < 2 || n == 0 {
            return Ok(Vec::new());
        }

        let scoring = self.subsample(table)?;
        let scoring_cols: Vec<&[f64]> = names
            .iter()
            .map(|name| scoring.channel(name).expect("plottable channel"))
            .collect();
        let matrix = DMatrix::from_fn(scoring.n_rows(), names.len(), |r, c| scoring_cols[c][r]);

        // Screen out near-constant channels before pairing.
        let mut eligible: Vec<Channel> = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            let values: Vec<f64> = matrix.column(idx).iter().copied().collect();
            let variance = normalized_variance(&values);
            if variance >= self.min_variance {
                eligible.push(Channel {
                    name: name.clone(),
                    class: classify(name),
                    variance,
                    values,
                });
            }
        }
        debug!(
            total = names.len(),
            eligible = eligible.len(),
            "screened channels by normalized variance"
        );
        if eligible.len() < 2 {
            return Ok(Vec::new());
        }

        let pairs: Vec<(usize, usize)> = (0..eligible.len())
            .flat_map(|i| ((i + 1)..eligible.len()).map(move |j| (i, j)))
            .collect();

        let mut recommendations: Vec<AxisRecommendation> = pairs
            .par_iter()
            .filter_map(|&(i, j)| self.score_pair(&eligible[i], &eligible[j]))
            .collect();

        recommendations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| (&a.x_channel, &a.y_channel).cmp(&(&b.x_channel, &b.y_channel)))
        });
        recommendations.truncate(n);
        Ok(recommendations)
    }

    fn score_pair(&self, a: &Channel, b: &Channel) -> Option<AxisRecommendation> {
        let correlation = stats::pearson(&a.values, &b.values);
        if correlation.abs() > self.max_correlation {
            return None;
        }

        let diversity = 1.0 - correlation.abs();
        let mut score = 0.5 * (a.variance + b.variance) * diversity;

        let cross_class = matches!(
            (a.class, b.class),
            (ChannelClass::Scatter, ChannelClass::Fluorescence)
                | (ChannelClass::Fluorescence, ChannelClass::Scatter)
        );
        let reason = if cross_class {
            score *= CROSS_CLASS_BONUS;
            "scatter vs fluorescence pairing"
        } else if diversity > 0.7 {
            "high variance, low redundancy"
        } else {
            "high combined variance, moderate correlation"
        };

        // Mixed pairs plot the marker on x against scatter on y; otherwise
        // keep a stable name order.
        let (x, y) = match (a.class, b.class) {
            (ChannelClass::Scatter, ChannelClass::Fluorescence) => (b, a),
            (ChannelClass::Fluorescence, ChannelClass::Scatter) => (a, b),
            _ if a.name <= b.name => (a, b),
            _ => (b, a),
        };

        Some(AxisRecommendation {
            x_channel: x.name.clone(),
            y_channel: y.name.clone(),
            score,
            reason: reason.to_string(),
        })
    }

    /// Deterministic without-replacement row sample, preserving row order.
    fn subsample(&self, table: &EventTable) -> Result<EventTable> {
        if table.n_rows() <= self.sample_size {
            return Ok(table.clone());
        }
        let mut indices: Vec<usize> = (0..table.n_rows()).collect();
        let mut rng = SimpleRng::new(self.seed);
        rng.shuffle(&mut indices);
        indices.truncate(self.sample_size);
        indices.sort_unstable();
        debug!(
            from = table.n_rows(),
            to = self.sample_size,
            "subsampled rows for axis scoring"
        );
        table.subset_rows(&indices)
    }
}

struct Channel {
    name: String,
    class: ChannelClass,
    variance: f64,
    values: Vec<f64>,
}

/// Variance of the min-max-scaled values: a scale-free spread measure.
///
/// Zero for constant or degenerate columns, at most 0.25 for a column split
/// between its extremes.
fn normalized_variance(values: &[f64]) -> f64 {
    let finite = stats::finite_values(values);
    if finite.len() < 2 {
        return 0.0;
    }
    let lo = stats::min(&finite);
    let hi = stats::max(&finite);
    let range = hi - lo;
    if range == 0.0 {
        return 0.0;
    }
    let scaled: Vec<f64> = finite.iter().map(|v| (v - lo) / range).collect();
    stats::variance(&scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic table: two scatter channels, two fluorescence channels
    /// (one a scaled copy of the other), a constant channel, and a time
    /// column.
    fn create_test_table(n_rows: usize) -> EventTable {
        let mut seed = 42u64;
        let mut rand = move || {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            ((seed >> 16) & 0x7FFF) as f64 / 32768.0
        };

        let fsc: Vec<f64> = (0..n_rows).map(|_| 100.0 + 900.0 * rand()).collect();
        let ssc: Vec<f64> = (0..n_rows).map(|_| 50.0 + 500.0 * rand()).collect();
        let v450: Vec<f64> = (0..n_rows).map(|_| 10.0 + 400.0 * rand()).collect();
        let b525: Vec<f64> = v450.iter().map(|v| v * 2.0 + 3.0).collect();
        let width = vec![5.0; n_rows];
        let time: Vec<f64> = (0..n_rows).map(|i| i as f64).collect();

        EventTable::from_columns(vec![
            ("FSC-A".to_string(), fsc),
            ("SSC-A".to_string(), ssc),
            ("V450-50-A".to_string(), v450),
            ("B525-40-A".to_string(), b525),
            ("Width".to_string(), width),
            ("Time".to_string(), time),
        ])
        .unwrap()
    }

    #[test]
    fn test_correlation_ceiling_respected() {
        let table = create_test_table(500);
        let recs = AxisSelector::new().recommend(&table, 20).unwrap();
        assert!(!recs.is_empty());
        // B525-40-A is a linear copy of V450-50-A; the pair must not appear.
        for rec in &recs {
            let pair = [rec.x_channel.as_str(), rec.y_channel.as_str()];
            assert!(
                !(pair.contains(&"V450-50-A") && pair.contains(&"B525-40-A")),
                "redundant pair recommended: {:?}",
                pair
            );
        }
    }

    #[test]
    fn test_sorted_by_non_increasing_score() {
        let table = create_test_table(500);
        let recs = AxisSelector::new().recommend(&table, 20).unwrap();
        for window in recs.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn test_constant_and_identifier_channels_excluded() {
        let table = create_test_table(500);
        let recs = AxisSelector::new().recommend(&table, 20).unwrap();
        for rec in &recs {
            assert_ne!(rec.x_channel, "Width");
            assert_ne!(rec.y_channel, "Width");
            assert_ne!(rec.x_channel, "Time");
            assert_ne!(rec.y_channel, "Time");
        }
    }

    #[test]
    fn test_truncates_to_requested_count() {
        let table = create_test_table(500);
        let recs = AxisSelector::new().recommend(&table, 3).unwrap();
        assert!(recs.len() <= 3);
    }

    #[test]
    fn test_never_pads_with_disqualified_pairs() {
        let table = create_test_table(500);
        // 4 informative channels give at most 6 pairs, one of which is
        // redundant; asking for 50 returns only the qualifiers.
        let recs = AxisSelector::new().recommend(&table, 50).unwrap();
        assert!(recs.len() <= 5);
    }

    #[test]
    fn test_fewer_than_two_channels_gives_empty() {
        let table =
            EventTable::from_columns(vec![("FSC-A".to_string(), vec![1.0, 2.0, 3.0])]).unwrap();
        let recs = AxisSelector::new().recommend(&table, 5).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_mixed_pair_orientation() {
        let table = create_test_table(500);
        let recs = AxisSelector::new().recommend(&table, 20).unwrap();
        for rec in &recs {
            if rec.reason == "scatter vs fluorescence pairing" {
                assert!(crate::data::is_fluorescence(&rec.x_channel));
                assert!(crate::data::is_scatter(&rec.y_channel));
            }
        }
    }

    #[test]
    fn test_subsampling_is_deterministic() {
        let table = create_test_table(2000);
        let selector = AxisSelector::new().with_sample_size(200);
        let a = selector.recommend(&table, 10).unwrap();
        let b = selector.recommend(&table, 10).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.x_channel, y.x_channel);
            assert_eq!(x.y_channel, y.y_channel);
            assert_eq!(x.score, y.score);
        }
    }

    #[test]
    fn test_cross_class_pairs_get_reason() {
        let table = create_test_table(500);
        let recs = AxisSelector::new().recommend(&table, 20).unwrap();
        assert!(recs
            .iter()
            .any(|r| r.reason == "scatter vs fluorescence pairing"));
    }

    #[test]
    fn test_normalized_variance_scale_free() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b: Vec<f64> = a.iter().map(|v| v * 1000.0).collect();
        let va = normalized_variance(&a);
        let vb = normalized_variance(&b);
        assert!((va - vb).abs() < 1e-12);
        assert_eq!(normalized_variance(&[7.0, 7.0, 7.0]), 0.0);
    }
}
