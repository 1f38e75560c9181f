//! Normalization of event-table columns.
//!
//! Three concerns, each producing augmented copies of the input:
//!
//! - **column**: z-score / min-max / robust scaling with explicit fitted
//!   parameters
//! - **baseline**: fold-change and log2 fold-change against control samples
//! - **units**: size and concentration unit conversion

pub mod baseline;
pub mod column;
pub mod units;

pub use baseline::{normalize_to_baseline, FOLD_CHANGE_SUFFIX, LOG2FC_SUFFIX};
pub use column::{
    apply_params, fit_normalize, ColumnParams, Method, NormalizationParams, NormalizedTable,
    NORM_SUFFIX,
};
pub use units::{conversion_factor, convert_units};
