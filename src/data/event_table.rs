//! Event tables: one row per detected particle, named numeric channels.

use crate::error::{FlowError, Result};
use std::collections::HashSet;
use std::path::Path;

/// Column name treated as the per-row sample identifier in delimited files.
pub const SAMPLE_ID_COLUMN: &str = "sample_id";

/// An immutable table of events.
///
/// Rows are detected particles/events; columns are named numeric channels
/// (scatter and fluorescence intensities, sizes, concentrations). An optional
/// per-row sample identifier links events back to the sample they came from.
/// Missing measurements are stored as `NaN`.
///
/// Construction validates that all columns have the same length and that
/// channel names are unique. Transforms never mutate a table in place; they
/// build augmented copies via [`EventTable::with_channel`] and
/// [`EventTable::map_channel`].
#[derive(Debug, Clone)]
pub struct EventTable {
    sample_ids: Option<Vec<String>>,
    channel_names: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl EventTable {
    /// Build a table from `(name, values)` columns.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(FlowError::EmptyData(
                "Event table needs at least one channel".to_string(),
            ));
        }
        let n_rows = columns[0].1.len();
        let mut seen = HashSet::new();
        let mut channel_names = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != n_rows {
                return Err(FlowError::LengthMismatch {
                    expected: n_rows,
                    actual: values.len(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(FlowError::DuplicateChannel(name));
            }
            channel_names.push(name);
            data.push(values);
        }
        Ok(Self {
            sample_ids: None,
            channel_names,
            columns: data,
            n_rows,
        })
    }

    /// Attach per-row sample identifiers.
    pub fn with_sample_ids(mut self, ids: Vec<String>) -> Result<Self> {
        if ids.len() != self.n_rows {
            return Err(FlowError::LengthMismatch {
                expected: self.n_rows,
                actual: ids.len(),
            });
        }
        self.sample_ids = Some(ids);
        Ok(self)
    }

    /// Number of rows (events).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of channels.
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.channel_names.len()
    }

    /// True when the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Channel names in column order.
    #[inline]
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// True when the named channel exists.
    pub fn has_channel(&self, name: &str) -> bool {
        self.channel_names.iter().any(|c| c == name)
    }

    /// Values of a channel, or `None` if absent.
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channel_names
            .iter()
            .position(|c| c == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Values of a channel, rejecting absent columns with a typed error.
    pub fn require_channel(&self, name: &str) -> Result<&[f64]> {
        self.channel(name)
            .ok_or_else(|| FlowError::MissingChannel(name.to_string()))
    }

    /// Validate that every named channel is present.
    pub fn require_channels<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            self.require_channel(name.as_ref())?;
        }
        Ok(())
    }

    /// Per-row sample identifiers, if attached.
    pub fn sample_ids(&self) -> Option<&[String]> {
        self.sample_ids.as_deref()
    }

    /// Per-row sample identifiers, as a hard requirement.
    pub fn require_sample_ids(&self, why: &str) -> Result<&[String]> {
        self.sample_ids
            .as_deref()
            .ok_or_else(|| FlowError::MissingSampleIds(why.to_string()))
    }

    /// Append a derived channel, consuming and returning the table.
    pub fn with_channel(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        if self.has_channel(name) {
            return Err(FlowError::DuplicateChannel(name.to_string()));
        }
        if values.len() != self.n_rows {
            return Err(FlowError::LengthMismatch {
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.channel_names.push(name.to_string());
        self.columns.push(values);
        Ok(self)
    }

    /// Replace a channel's values through a pointwise transform.
    pub fn map_channel(mut self, name: &str, f: impl Fn(f64) -> f64) -> Result<Self> {
        let idx = self
            .channel_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| FlowError::MissingChannel(name.to_string()))?;
        for v in &mut self.columns[idx] {
            *v = f(*v);
        }
        Ok(self)
    }

    /// Row indices whose sample id is in `samples`, preserving row order.
    pub fn rows_for_samples<S: AsRef<str>>(&self, samples: &[S]) -> Result<Vec<usize>> {
        let ids = self.require_sample_ids("sample-restricted selection")?;
        let wanted: HashSet<&str> = samples.iter().map(|s| s.as_ref()).collect();
        Ok(ids
            .iter()
            .enumerate()
            .filter(|(_, id)| wanted.contains(id.as_str()))
            .map(|(i, _)| i)
            .collect())
    }

    /// A new table containing only the given rows, in the given order.
    pub fn subset_rows(&self, indices: &[usize]) -> Result<Self> {
        for &i in indices {
            if i >= self.n_rows {
                return Err(FlowError::InvalidParameter(format!(
                    "Row index {} out of bounds ({} rows)",
                    i, self.n_rows
                )));
            }
        }
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&i| col[i]).collect())
            .collect();
        Ok(Self {
            sample_ids: self
                .sample_ids
                .as_ref()
                .map(|ids| indices.iter().map(|&i| ids[i].clone()).collect()),
            channel_names: self.channel_names.clone(),
            columns,
            n_rows: indices.len(),
        })
    }

    /// Load a table from a delimited file.
    ///
    /// The delimiter is a tab for `.tsv` files and a comma otherwise. A
    /// column named `sample_id` becomes the per-row identifier; every other
    /// column must be numeric, with empty/`NA`/`NaN` cells parsed as missing.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") => b'\t',
            _ => b',',
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() {
            return Err(FlowError::EmptyData("File has no header".to_string()));
        }
        let id_idx = headers.iter().position(|h| h == SAMPLE_ID_COLUMN);
        let channel_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != id_idx)
            .map(|(_, h)| h.clone())
            .collect();
        if channel_names.is_empty() {
            return Err(FlowError::EmptyData(
                "File has no channel columns".to_string(),
            ));
        }

        let mut sample_ids: Vec<String> = Vec::new();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); channel_names.len()];
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let mut chan = 0usize;
            for (col_idx, cell) in record.iter().enumerate() {
                if Some(col_idx) == id_idx {
                    sample_ids.push(cell.to_string());
                    continue;
                }
                columns[chan].push(parse_cell(cell, row_idx, &headers[col_idx])?);
                chan += 1;
            }
        }

        let mut table = Self::from_columns(
            channel_names.into_iter().zip(columns).collect(),
        )?;
        if id_idx.is_some() {
            table = table.with_sample_ids(sample_ids)?;
        }
        Ok(table)
    }

    /// Write the table to a delimited file (tab for `.tsv`, comma otherwise).
    ///
    /// Missing values are written as `NA`.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") => b'\t',
            _ => b',',
        };
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)?;

        let mut header: Vec<&str> = Vec::with_capacity(self.n_channels() + 1);
        if self.sample_ids.is_some() {
            header.push(SAMPLE_ID_COLUMN);
        }
        header.extend(self.channel_names.iter().map(|s| s.as_str()));
        writer.write_record(&header)?;

        for row in 0..self.n_rows {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            if let Some(ids) = &self.sample_ids {
                record.push(ids[row].clone());
            }
            for col in &self.columns {
                let v = col[row];
                record.push(if v.is_nan() {
                    "NA".to_string()
                } else {
                    format!("{}", v)
                });
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") || trimmed.eq_ignore_ascii_case("nan")
    {
        return Ok(f64::NAN);
    }
    trimmed.parse().map_err(|_| FlowError::InvalidValue {
        value: cell.to_string(),
        row,
        column: column.to_string(),
    })
}
