//! Automatic selection of informative channel pairs for plotting.

mod axes;

pub use axes::{AxisRecommendation, AxisSelector};
