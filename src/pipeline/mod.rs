//! Pipeline composition and execution for event-table analysis.

mod runner;

pub use runner::{AnalysisReport, Pipeline, PipelineConfig, PipelineStep};
