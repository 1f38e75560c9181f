//! Channel classification by instrument naming conventions.
//!
//! Scatter channels carry `FSC`/`SSC` in the name and an area/height suffix
//! (`FSC-A`, `VSSC1-H`). Fluorescence channels follow the detector-prefix +
//! wavelength convention and end in `-A` (`V450-50-A`, `B525-40-A`).

use crate::data::EventTable;
use regex::Regex;

/// Semantic class of a channel, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelClass {
    /// Forward/side scatter: proxies for particle size and complexity.
    Scatter,
    /// Fluorescence marker intensity.
    Fluorescence,
    /// Anything else (ratios, widths, derived columns).
    Other,
}

/// Column names that identify rather than measure: never plotted or scored.
pub fn is_identifier(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "sample_id" | "event_id" | "time" | "index"
    )
}

/// True for forward/side-scatter area or height channels.
pub fn is_scatter(name: &str) -> bool {
    (name.contains("FSC") || name.contains("SSC"))
        && (name.ends_with("-A") || name.ends_with("-H"))
}

/// True for detector-prefix + wavelength fluorescence area channels.
pub fn is_fluorescence(name: &str) -> bool {
    if is_scatter(name) {
        return false;
    }
    let re = Regex::new(r"^[VBYR]\d").unwrap();
    re.is_match(name) && name.ends_with("-A")
}

/// Classify a channel name.
pub fn classify(name: &str) -> ChannelClass {
    if is_scatter(name) {
        ChannelClass::Scatter
    } else if is_fluorescence(name) {
        ChannelClass::Fluorescence
    } else {
        ChannelClass::Other
    }
}

/// Channels worth analyzing: everything except identifier columns.
pub fn plottable_channels(table: &EventTable) -> Vec<String> {
    table
        .channel_names()
        .iter()
        .filter(|name| !is_identifier(name))
        .cloned()
        .collect()
}

/// Scatter channels present in a table.
pub fn scatter_channels(table: &EventTable) -> Vec<String> {
    plottable_channels(table)
        .into_iter()
        .filter(|name| is_scatter(name))
        .collect()
}

/// Fluorescence channels present in a table.
pub fn fluorescence_channels(table: &EventTable) -> Vec<String> {
    plottable_channels(table)
        .into_iter()
        .filter(|name| is_fluorescence(name))
        .collect()
}
