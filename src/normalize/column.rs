//! Per-column scale normalization: z-score, min-max, robust.

use crate::data::{plottable_channels, EventTable};
use crate::error::{FlowError, Result};
use crate::stats;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

/// Suffix appended to derived normalized columns.
pub const NORM_SUFFIX: &str = "_norm";

/// Column normalization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// `(x - mean) / std`
    Zscore,
    /// `(x - min) / (max - min)`
    Minmax,
    /// `(x - median) / IQR`
    Robust,
}

impl Method {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Method::Zscore => "zscore",
            Method::Minmax => "minmax",
            Method::Robust => "robust",
        }
    }
}

impl FromStr for Method {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zscore" | "z-score" => Ok(Method::Zscore),
            "minmax" | "min-max" => Ok(Method::Minmax),
            "robust" => Ok(Method::Robust),
            other => Err(FlowError::InvalidParameter(format!(
                "Unknown normalization method: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fitted location/scale parameters for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnParams {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

impl ColumnParams {
    fn fit(values: &[f64]) -> Self {
        let finite = stats::finite_values(values);
        Self {
            mean: stats::mean(&finite),
            std: stats::std_dev(&finite),
            min: stats::min(&finite),
            max: stats::max(&finite),
            median: stats::median(&finite),
            q25: stats::quantile(&finite, 0.25),
            q75: stats::quantile(&finite, 0.75),
        }
    }

    /// Interquartile range.
    pub fn iqr(&self) -> f64 {
        self.q75 - self.q25
    }
}

/// Parameters fitted by one normalization call, keyed by column name.
///
/// Returned explicitly (not held as normalizer state) so the same transform
/// can later be applied to new data via [`apply_params`] without refitting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationParams {
    columns: BTreeMap<String, ColumnParams>,
}

impl NormalizationParams {
    /// Parameters for a column, if fitted.
    pub fn get(&self, column: &str) -> Option<&ColumnParams> {
        self.columns.get(column)
    }

    /// Fitted column names in deterministic order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Number of fitted columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when nothing was fitted.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A table augmented with normalized columns plus the parameters used.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub table: EventTable,
    pub method: Method,
    pub params: NormalizationParams,
}

/// Fit and apply a normalization to the selected columns.
///
/// Each input column gains a `{name}_norm` sibling; the input table is not
/// mutated. `columns = None` selects every non-identifier channel.
/// Degenerate columns (zero std, zero range, zero IQR) are carried through
/// unchanged with a warning.
pub fn fit_normalize(
    table: &EventTable,
    method: Method,
    columns: Option<&[String]>,
) -> Result<NormalizedTable> {
    if table.is_empty() {
        return Err(FlowError::EmptyData(
            "Cannot normalize an empty table".to_string(),
        ));
    }
    let selected: Vec<String> = match columns {
        Some(cols) => {
            table.require_channels(cols)?;
            cols.to_vec()
        }
        None => plottable_channels(table),
    };
    if selected.is_empty() {
        return Err(FlowError::EmptyData(
            "No channels selected for normalization".to_string(),
        ));
    }

    let fitted: Vec<(String, ColumnParams, Vec<f64>)> = selected
        .par_iter()
        .map(|name| {
            let values = table.channel(name).expect("validated above");
            let params = ColumnParams::fit(values);
            let normalized = transform_column(name, values, method, &params);
            (name.clone(), params, normalized)
        })
        .collect();

    let mut out = table.clone();
    let mut params = NormalizationParams::default();
    for (name, col_params, values) in fitted {
        out = out.with_channel(&format!("{}{}", name, NORM_SUFFIX), values)?;
        params.columns.insert(name, col_params);
    }

    Ok(NormalizedTable {
        table: out,
        method,
        params,
    })
}

/// Apply previously fitted parameters to new data.
///
/// Every column in `params` must exist in the table; the stored location and
/// scale are used as-is, never re-derived.
pub fn apply_params(
    table: &EventTable,
    method: Method,
    params: &NormalizationParams,
) -> Result<EventTable> {
    if params.is_empty() {
        return Err(FlowError::InvalidParameter(
            "Parameter set is empty".to_string(),
        ));
    }
    let mut out = table.clone();
    for (name, col_params) in &params.columns {
        let values = table.require_channel(name)?;
        let normalized = transform_column(name, values, method, col_params);
        out = out.with_channel(&format!("{}{}", name, NORM_SUFFIX), normalized)?;
    }
    Ok(out)
}

fn transform_column(name: &str, values: &[f64], method: Method, params: &ColumnParams) -> Vec<f64> {
    let (center, scale, what) = match method {
        Method::Zscore => (params.mean, params.std, "standard deviation"),
        Method::Minmax => (params.min, params.max - params.min, "range"),
        Method::Robust => (params.median, params.iqr(), "IQR"),
    };
    if !(scale > 0.0) {
        warn!(channel = name, "zero {} detected, leaving values unchanged", what);
        return values.to_vec();
    }
    values.iter().map(|v| (v - center) / scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;
    use approx::assert_relative_eq;

    fn create_test_table() -> EventTable {
        EventTable::from_columns(vec![
            ("FSC-A".to_string(), vec![100.0, 200.0, 300.0, 400.0, 500.0]),
            ("SSC-A".to_string(), vec![10.0, 10.0, 10.0, 10.0, 10.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_zscore_mean_zero_std_one() {
        let result = fit_normalize(&create_test_table(), Method::Zscore, None).unwrap();
        let norm = result.table.channel("FSC-A_norm").unwrap();
        assert_relative_eq!(stats::mean(norm), 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats::std_dev(norm), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_minmax_bounds() {
        let result = fit_normalize(&create_test_table(), Method::Minmax, None).unwrap();
        let norm = result.table.channel("FSC-A_norm").unwrap();
        assert_relative_eq!(stats::min(norm), 0.0);
        assert_relative_eq!(stats::max(norm), 1.0);
        assert!(norm.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_robust_shift_invariant() {
        let base = create_test_table();
        let shifted = EventTable::from_columns(vec![(
            "FSC-A".to_string(),
            base.channel("FSC-A")
                .unwrap()
                .iter()
                .map(|v| v + 1234.5)
                .collect(),
        )])
        .unwrap();

        let cols = vec!["FSC-A".to_string()];
        let a = fit_normalize(&base, Method::Robust, Some(&cols)).unwrap();
        let b = fit_normalize(&shifted, Method::Robust, Some(&cols)).unwrap();
        let na = a.table.channel("FSC-A_norm").unwrap();
        let nb = b.table.channel("FSC-A_norm").unwrap();
        for (x, y) in na.iter().zip(nb.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_std_left_unchanged() {
        let result = fit_normalize(&create_test_table(), Method::Zscore, None).unwrap();
        let norm = result.table.channel("SSC-A_norm").unwrap();
        assert_eq!(norm, &[10.0, 10.0, 10.0, 10.0, 10.0]);
        // parameters are still recorded
        assert_relative_eq!(result.params.get("SSC-A").unwrap().std, 0.0);
    }

    #[test]
    fn test_input_not_mutated() {
        let table = create_test_table();
        let _ = fit_normalize(&table, Method::Zscore, None).unwrap();
        assert_eq!(table.n_channels(), 2);
    }

    #[test]
    fn test_unknown_method_rejected() {
        let result: Result<Method> = "quantile".parse();
        assert!(matches!(result, Err(FlowError::InvalidParameter(_))));
        assert_eq!("z-score".parse::<Method>().unwrap(), Method::Zscore);
    }

    #[test]
    fn test_missing_column_rejected() {
        let cols = vec!["FL1-A".to_string()];
        let result = fit_normalize(&create_test_table(), Method::Zscore, Some(&cols));
        assert!(matches!(result, Err(FlowError::MissingChannel(_))));
    }

    #[test]
    fn test_params_recorded() {
        let result = fit_normalize(&create_test_table(), Method::Zscore, None).unwrap();
        let p = result.params.get("FSC-A").unwrap();
        assert_relative_eq!(p.mean, 300.0);
        assert_relative_eq!(p.min, 100.0);
        assert_relative_eq!(p.max, 500.0);
        assert_relative_eq!(p.median, 300.0);
        assert_relative_eq!(p.q25, 200.0);
        assert_relative_eq!(p.q75, 400.0);
    }

    #[test]
    fn test_apply_params_reuses_fit() {
        let fit = fit_normalize(
            &create_test_table(),
            Method::Zscore,
            Some(&["FSC-A".to_string()]),
        )
        .unwrap();

        // New data normalized against the original fit, not its own stats.
        let fresh = EventTable::from_columns(vec![(
            "FSC-A".to_string(),
            vec![300.0, 300.0 + fit.params.get("FSC-A").unwrap().std],
        )])
        .unwrap();
        let applied = apply_params(&fresh, Method::Zscore, &fit.params).unwrap();
        let norm = applied.channel("FSC-A_norm").unwrap();
        assert_relative_eq!(norm[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(norm[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_params_missing_column() {
        let fit = fit_normalize(&create_test_table(), Method::Zscore, None).unwrap();
        let other =
            EventTable::from_columns(vec![("V450-50-A".to_string(), vec![1.0, 2.0])]).unwrap();
        let result = apply_params(&other, Method::Zscore, &fit.params);
        assert!(matches!(result, Err(FlowError::MissingChannel(_))));
    }

    #[test]
    fn test_empty_table_rejected() {
        let empty =
            EventTable::from_columns(vec![("FSC-A".to_string(), Vec::new())]).unwrap();
        let result = fit_normalize(&empty, Method::Zscore, None);
        assert!(matches!(result, Err(FlowError::EmptyData(_))));
    }
}
