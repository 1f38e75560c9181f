//! Per-channel descriptive statistics for an event table.

use crate::data::{plottable_channels, EventTable};
use crate::stats;
use serde::{Deserialize, Serialize};

/// Aggregate statistics for a single channel. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub name: String,
    /// Finite observations.
    pub n: usize,
    /// Missing (NaN) observations.
    pub n_missing: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

/// Statistics for every plottable channel of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStatsProfile {
    pub n_rows: usize,
    pub channels: Vec<ChannelStats>,
}

impl ChannelStatsProfile {
    /// Stats for a named channel, if profiled.
    pub fn get(&self, name: &str) -> Option<&ChannelStats> {
        self.channels.iter().find(|c| c.name == name)
    }
}

impl std::fmt::Display for ChannelStatsProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Channel Profile ({} events)", self.n_rows)?;
        for c in &self.channels {
            writeln!(
                f,
                "  {:<16} n={:<8} mean={:<12.4} std={:<12.4} median={:<12.4} [{:.4}, {:.4}]",
                c.name, c.n, c.mean, c.std, c.median, c.min, c.max
            )?;
        }
        Ok(())
    }
}

/// Profile every non-identifier channel.
pub fn profile_channels(table: &EventTable) -> ChannelStatsProfile {
    let channels = plottable_channels(table)
        .into_iter()
        .map(|name| {
            let values = table.channel(&name).expect("plottable channel");
            let finite = stats::finite_values(values);
            ChannelStats {
                n: finite.len(),
                n_missing: values.len() - finite.len(),
                mean: stats::mean(&finite),
                std: stats::std_dev(&finite),
                min: stats::min(&finite),
                max: stats::max(&finite),
                median: stats::median(&finite),
                q25: stats::quantile(&finite, 0.25),
                q75: stats::quantile(&finite, 0.75),
                name,
            }
        })
        .collect();

    ChannelStatsProfile {
        n_rows: table.n_rows(),
        channels,
    }
}
