//! Pipeline runner for composing and executing analysis steps.

use crate::data::EventTable;
use crate::detect::{detect_outliers_iqr, detect_outliers_zscore, OutlierReport};
use crate::error::{FlowError, Result};
use crate::normalize::{
    convert_units, fit_normalize, normalize_to_baseline, Method, NormalizationParams,
};
use crate::profile::summarize_by_sample;
use crate::select::{AxisRecommendation, AxisSelector};
use serde::{Deserialize, Serialize};

/// A step in the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Collapse events into a per-sample summary table.
    SummarizeBySample,
    /// Convert a column between units.
    ConvertUnits {
        column: String,
        from: String,
        to: String,
    },
    /// Fit and apply a column normalization.
    Normalize {
        method: Method,
        columns: Option<Vec<String>>,
    },
    /// Fold-change normalization against baseline samples.
    NormalizeBaseline {
        baseline_samples: Vec<String>,
        columns: Option<Vec<String>>,
    },
    /// Rank channel pairs for plotting.
    SelectAxes {
        n_recommendations: usize,
        min_variance: f64,
        max_correlation: f64,
        sample_size: usize,
    },
    /// Flag per-event outliers by z-score.
    DetectOutliersZscore {
        channels: Vec<String>,
        threshold: f64,
    },
    /// Flag per-event outliers by IQR fences.
    DetectOutliersIqr { channels: Vec<String>, factor: f64 },
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(FlowError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(FlowError::from)
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Pipeline name.
    pub name: String,
    /// Final table after all transforms.
    #[serde(skip)]
    pub table: EventTable,
    /// Parameters of the last column normalization, if any.
    pub params: Option<NormalizationParams>,
    /// Axis recommendations, if a selection step ran.
    pub recommendations: Vec<AxisRecommendation>,
    /// One report per outlier-detection step, in step order.
    pub outliers: Vec<OutlierReport>,
}

impl AnalysisReport {
    /// Serialize the structured results (without the table) to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(FlowError::from)
    }
}

/// Builder for constructing and running analysis pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Collapse events into a per-sample summary table.
    pub fn summarize_by_sample(mut self) -> Self {
        self.steps.push(PipelineStep::SummarizeBySample);
        self
    }

    /// Convert a column between units.
    pub fn convert_units(mut self, column: &str, from: &str, to: &str) -> Self {
        self.steps.push(PipelineStep::ConvertUnits {
            column: column.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    /// Add a column normalization over the default column selection.
    pub fn normalize(self, method: Method) -> Self {
        self.normalize_columns(method, None)
    }

    /// Add a column normalization over explicit columns.
    pub fn normalize_columns(mut self, method: Method, columns: Option<Vec<String>>) -> Self {
        self.steps.push(PipelineStep::Normalize { method, columns });
        self
    }

    /// Add baseline fold-change normalization.
    pub fn normalize_baseline(mut self, baseline_samples: &[&str]) -> Self {
        self.steps.push(PipelineStep::NormalizeBaseline {
            baseline_samples: baseline_samples.iter().map(|s| s.to_string()).collect(),
            columns: None,
        });
        self
    }

    /// Add axis selection with default thresholds.
    pub fn select_axes(mut self, n_recommendations: usize) -> Self {
        let defaults = AxisSelector::default();
        self.steps.push(PipelineStep::SelectAxes {
            n_recommendations,
            min_variance: defaults.min_variance,
            max_correlation: defaults.max_correlation,
            sample_size: defaults.sample_size,
        });
        self
    }

    /// Add z-score outlier detection.
    pub fn detect_outliers_zscore(mut self, channels: &[&str], threshold: f64) -> Self {
        self.steps.push(PipelineStep::DetectOutliersZscore {
            channels: channels.iter().map(|s| s.to_string()).collect(),
            threshold,
        });
        self
    }

    /// Add IQR outlier detection.
    pub fn detect_outliers_iqr(mut self, channels: &[&str], factor: f64) -> Self {
        self.steps.push(PipelineStep::DetectOutliersIqr {
            channels: channels.iter().map(|s| s.to_string()).collect(),
            factor,
        });
        self
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Run the pipeline on a table.
    pub fn run(&self, table: &EventTable) -> Result<AnalysisReport> {
        let mut state = PipelineState::new(table.clone());

        for (i, step) in self.steps.iter().enumerate() {
            state = state.apply(step).map_err(|e| {
                FlowError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        Ok(state.finalize(&self.name))
    }
}

/// Internal state during pipeline execution.
struct PipelineState {
    table: EventTable,
    params: Option<NormalizationParams>,
    recommendations: Vec<AxisRecommendation>,
    outliers: Vec<OutlierReport>,
}

impl PipelineState {
    fn new(table: EventTable) -> Self {
        Self {
            table,
            params: None,
            recommendations: Vec::new(),
            outliers: Vec::new(),
        }
    }

    fn apply(mut self, step: &PipelineStep) -> Result<Self> {
        match step {
            PipelineStep::SummarizeBySample => {
                self.table = summarize_by_sample(&self.table)?;
            }
            PipelineStep::ConvertUnits { column, from, to } => {
                self.table = convert_units(&self.table, column, from, to)?;
            }
            PipelineStep::Normalize { method, columns } => {
                let normalized = fit_normalize(&self.table, *method, columns.as_deref())?;
                self.table = normalized.table;
                self.params = Some(normalized.params);
            }
            PipelineStep::NormalizeBaseline {
                baseline_samples,
                columns,
            } => {
                self.table =
                    normalize_to_baseline(&self.table, baseline_samples, columns.as_deref())?;
            }
            PipelineStep::SelectAxes {
                n_recommendations,
                min_variance,
                max_correlation,
                sample_size,
            } => {
                let selector = AxisSelector::new()
                    .with_min_variance(*min_variance)
                    .with_max_correlation(*max_correlation)
                    .with_sample_size(*sample_size);
                self.recommendations = selector.recommend(&self.table, *n_recommendations)?;
            }
            PipelineStep::DetectOutliersZscore { channels, threshold } => {
                self.outliers
                    .push(detect_outliers_zscore(&self.table, channels, *threshold)?);
            }
            PipelineStep::DetectOutliersIqr { channels, factor } => {
                self.outliers
                    .push(detect_outliers_iqr(&self.table, channels, *factor)?);
            }
        }
        Ok(self)
    }

    fn finalize(self, name: &str) -> AnalysisReport {
        AnalysisReport {
            name: name.to_string(),
            table: self.table,
            params: self.params,
            recommendations: self.recommendations,
            outliers: self.outliers,
        }
    }
}
