//! Parallel batch driver: run one pipeline over many independent files.
//!
//! Each input file is an isolated unit of work; the only shared state is the
//! output directory, whose creation is idempotent. Per-file failures are
//! collected rather than aborting the batch.

use crate::data::EventTable;
use crate::error::Result;
use crate::pipeline::Pipeline;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Outcome of processing one input file.
#[derive(Debug)]
pub struct BatchOutcome {
    pub input: PathBuf,
    /// Written table path on success.
    pub table_path: Option<PathBuf>,
    /// Written JSON report path on success.
    pub report_path: Option<PathBuf>,
    /// Failure message, if the file could not be processed.
    pub error: Option<String>,
}

impl BatchOutcome {
    /// True when the file was processed and its artifacts written.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run a pipeline over many files in parallel.
///
/// Writes `{stem}_processed.csv` and `{stem}_report.json` per input into
/// `output_dir`. Returns one outcome per input, in input order.
pub fn run_batch(
    inputs: &[PathBuf],
    output_dir: &Path,
    pipeline: &Pipeline,
) -> Result<Vec<BatchOutcome>> {
    fs::create_dir_all(output_dir)?;

    let outcomes: Vec<BatchOutcome> = inputs
        .par_iter()
        .map(|input| match process_one(input, output_dir, pipeline) {
            Ok((table_path, report_path)) => {
                info!(input = %input.display(), "processed");
                BatchOutcome {
                    input: input.clone(),
                    table_path: Some(table_path),
                    report_path: Some(report_path),
                    error: None,
                }
            }
            Err(e) => {
                error!(input = %input.display(), error = %e, "failed");
                BatchOutcome {
                    input: input.clone(),
                    table_path: None,
                    report_path: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    Ok(outcomes)
}

fn process_one(
    input: &Path,
    output_dir: &Path,
    pipeline: &Pipeline,
) -> Result<(PathBuf, PathBuf)> {
    let table = EventTable::from_path(input)?;
    let report = pipeline.run(&table)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("input");
    let table_path = output_dir.join(format!("{}_processed.csv", stem));
    let report_path = output_dir.join(format!("{}_report.json", stem));

    report.table.to_path(&table_path)?;
    fs::write(&report_path, report.to_json()?)?;
    Ok((table_path, report_path))
}
