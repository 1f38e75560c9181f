//! Table-driven unit conversion for size and concentration columns.

use crate::data::EventTable;
use crate::error::{FlowError, Result};
use tracing::info;

/// Multiplicative factor converting `from` into `to`, if supported.
///
/// Size units: `nm`, `μm` (ASCII alias `um`), `mm`. Concentration units:
/// `particles/mL`, `particles/L`. Identity pairs yield 1.0.
pub fn conversion_factor(from: &str, to: &str) -> Option<f64> {
    let from = canonical(from);
    let to = canonical(to);
    if from == to {
        return Some(1.0);
    }
    let factor = match (from.as_str(), to.as_str()) {
        ("nm", "μm") => 0.001,
        ("μm", "nm") => 1000.0,
        ("nm", "mm") => 0.000_001,
        ("mm", "nm") => 1_000_000.0,
        ("μm", "mm") => 0.001,
        ("mm", "μm") => 1000.0,
        ("particles/mL", "particles/L") => 1000.0,
        ("particles/L", "particles/mL") => 0.001,
        _ => return None,
    };
    Some(factor)
}

fn canonical(unit: &str) -> String {
    if unit == "um" {
        "μm".to_string()
    } else {
        unit.to_string()
    }
}

/// Convert a column between units, producing a new table.
///
/// Unsupported `(from, to)` pairs fail with an invalid-argument error.
pub fn convert_units(table: &EventTable, column: &str, from: &str, to: &str) -> Result<EventTable> {
    table.require_channel(column)?;
    let factor = conversion_factor(from, to).ok_or_else(|| FlowError::UnsupportedConversion {
        from: from.to_string(),
        to: to.to_string(),
    })?;
    let out = table.clone().map_channel(column, |v| v * factor)?;
    info!(column, from, to, factor, "converted units");
    Ok(out)
}
