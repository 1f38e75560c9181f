//! Composable analysis of flow-cytometry and nanoparticle-tracking tables.
//!
//! This library operates on event tables that an external parser has already
//! extracted from instrument files: named numeric channels, one row per
//! detected particle, an optional per-row sample identifier.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core structures (EventTable, channel classification)
//! - **stats**: Descriptive-statistics primitives
//! - **profile**: Per-channel and per-sample summaries
//! - **normalize**: Column scaling, baseline fold-change, unit conversion
//! - **select**: Auto-axis channel-pair recommendation
//! - **detect**: Scatter-shift and outlier detection
//! - **pipeline**: Pipeline composition and execution
//! - **batch**: Parallel driver over many input files
//!
//! # Example
//!
//! ```no_run
//! use flowmetrics::prelude::*;
//!
//! // Load a parsed event table
//! let table = EventTable::from_path("events.csv").unwrap();
//!
//! // Run an analysis pipeline
//! let report = Pipeline::new()
//!     .name("qc")
//!     .normalize(Method::Zscore)
//!     .select_axes(7)
//!     .detect_outliers_iqr(&["FSC-A", "SSC-A"], 1.5)
//!     .run(&table)
//!     .unwrap();
//!
//! for rec in &report.recommendations {
//!     println!("{} vs {} ({:.3}): {}", rec.x_channel, rec.y_channel, rec.score, rec.reason);
//! }
//! ```

pub mod batch;
pub mod data;
pub mod detect;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod select;
pub mod stats;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::batch::{run_batch, BatchOutcome};
    pub use crate::data::{
        classify, fluorescence_channels, plottable_channels, scatter_channels, ChannelClass,
        EventTable,
    };
    pub use crate::detect::{
        detect_outliers_iqr, detect_outliers_zscore, BaselineStats, OutlierMethod, OutlierReport,
        ShiftDetector, ShiftReport,
    };
    pub use crate::error::{FlowError, Result};
    pub use crate::normalize::{
        apply_params, conversion_factor, convert_units, fit_normalize, normalize_to_baseline,
        ColumnParams, Method, NormalizationParams, NormalizedTable,
    };
    pub use crate::pipeline::{AnalysisReport, Pipeline, PipelineConfig, PipelineStep};
    pub use crate::profile::{
        profile_channels, summarize_by_sample, ChannelStats, ChannelStatsProfile,
    };
    pub use crate::select::{AxisRecommendation, AxisSelector};
}
