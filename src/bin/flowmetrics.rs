//! flowmetrics - event-table analysis CLI
//!
//! Command-line interface for normalizing cytometry tables, ranking plot
//! axes, and detecting anomalies.

use clap::{Parser, Subcommand, ValueEnum};
use flowmetrics::batch::run_batch;
use flowmetrics::data::EventTable;
use flowmetrics::detect::{detect_outliers_iqr, detect_outliers_zscore, ShiftDetector};
use flowmetrics::error::Result;
use flowmetrics::normalize::{convert_units, fit_normalize, normalize_to_baseline, Method};
use flowmetrics::pipeline::{Pipeline, PipelineConfig};
use flowmetrics::profile::profile_channels;
use flowmetrics::select::AxisSelector;
use std::path::PathBuf;

/// CLI-friendly normalization method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMethod {
    /// (x - mean) / std
    Zscore,
    /// (x - min) / (max - min)
    Minmax,
    /// (x - median) / IQR
    Robust,
}

impl From<CliMethod> for Method {
    fn from(method: CliMethod) -> Self {
        match method {
            CliMethod::Zscore => Method::Zscore,
            CliMethod::Minmax => Method::Minmax,
            CliMethod::Robust => Method::Robust,
        }
    }
}

/// CLI-friendly outlier rule enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierRule {
    /// |value - mean| / std beyond a threshold
    Zscore,
    /// Outside [Q25 - factor*IQR, Q75 + factor*IQR]
    Iqr,
}

/// Event-table analysis for flow-cytometry and nanoparticle-tracking data
#[derive(Parser)]
#[command(name = "flowmetrics")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize columns of an event table
    Normalize {
        /// Path to input table (CSV, or TSV by extension)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the augmented table
        #[arg(short, long)]
        output: PathBuf,

        /// Normalization method
        #[arg(short, long, value_enum, default_value = "zscore")]
        method: CliMethod,

        /// Comma-separated columns (default: all channels)
        #[arg(long)]
        columns: Option<String>,

        /// Optional path to write the fitted parameters as JSON
        #[arg(long)]
        params_out: Option<PathBuf>,
    },

    /// Normalize against baseline/control samples (fold-change, log2fc)
    Baseline {
        /// Path to input table
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the augmented table
        #[arg(short, long)]
        output: PathBuf,

        /// Comma-separated baseline sample ids
        #[arg(short, long)]
        baseline: String,

        /// Comma-separated columns (default: all channels)
        #[arg(long)]
        columns: Option<String>,
    },

    /// Convert a column between units
    Convert {
        /// Path to input table
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the converted table
        #[arg(short, long)]
        output: PathBuf,

        /// Column to convert
        #[arg(long)]
        column: String,

        /// Current unit (e.g. nm, um, particles/mL)
        #[arg(long)]
        from: String,

        /// Target unit
        #[arg(long)]
        to: String,
    },

    /// Recommend channel pairs for scatter plots
    SelectAxes {
        /// Path to input table
        #[arg(short, long)]
        input: PathBuf,

        /// Number of recommendations
        #[arg(short, long, default_value = "7")]
        n: usize,

        /// Minimum normalized variance per channel
        #[arg(long, default_value = "0.01")]
        min_variance: f64,

        /// Maximum absolute correlation per pair
        #[arg(long, default_value = "0.95")]
        max_correlation: f64,

        /// Rows sampled for scoring
        #[arg(long, default_value = "10000")]
        sample_size: usize,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Compare a test sample's scatter distribution against a baseline file
    Shift {
        /// Path to the baseline table
        #[arg(short, long)]
        baseline: PathBuf,

        /// Path to the test table
        #[arg(short, long)]
        test: PathBuf,

        /// X channel
        #[arg(short, long, default_value = "FSC-A")]
        x_channel: String,

        /// Y channel
        #[arg(short, long, default_value = "SSC-A")]
        y_channel: String,

        /// Anomaly threshold in baseline standard deviations
        #[arg(long, default_value = "2.0")]
        threshold: f64,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Flag per-event outliers
    Outliers {
        /// Path to input table
        #[arg(short, long)]
        input: PathBuf,

        /// Comma-separated channels to test
        #[arg(short, long)]
        channels: String,

        /// Detection rule
        #[arg(short, long, value_enum, default_value = "zscore")]
        rule: CliOutlierRule,

        /// Z-score threshold (zscore rule)
        #[arg(long, default_value = "3.0")]
        threshold: f64,

        /// IQR fence factor (iqr rule)
        #[arg(long, default_value = "1.5")]
        factor: f64,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Profile the channels of an event table
    Profile {
        /// Path to input table
        #[arg(short, long)]
        input: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Path to input table
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the processed table
        #[arg(short, long)]
        output: PathBuf,

        /// Optional path for the JSON report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },

    /// Run a pipeline over many files in parallel
    Batch {
        /// Input tables
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for per-file artifacts
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Pipeline configuration YAML (default: z-score + axis selection)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Normalize {
            input,
            output,
            method,
            columns,
            params_out,
        } => cmd_normalize(&input, &output, method, columns.as_deref(), params_out.as_deref()),

        Commands::Baseline {
            input,
            output,
            baseline,
            columns,
        } => cmd_baseline(&input, &output, &baseline, columns.as_deref()),

        Commands::Convert {
            input,
            output,
            column,
            from,
            to,
        } => cmd_convert(&input, &output, &column, &from, &to),

        Commands::SelectAxes {
            input,
            n,
            min_variance,
            max_correlation,
            sample_size,
            format,
        } => cmd_select_axes(&input, n, min_variance, max_correlation, sample_size, &format),

        Commands::Shift {
            baseline,
            test,
            x_channel,
            y_channel,
            threshold,
            format,
        } => cmd_shift(&baseline, &test, &x_channel, &y_channel, threshold, &format),

        Commands::Outliers {
            input,
            channels,
            rule,
            threshold,
            factor,
            format,
        } => cmd_outliers(&input, &channels, rule, threshold, factor, &format),

        Commands::Profile { input, format } => cmd_profile(&input, &format),

        Commands::Run {
            config,
            input,
            output,
            report,
        } => cmd_run(&config, &input, &output, report.as_deref()),

        Commands::Example { output } => cmd_example(&output),

        Commands::Batch {
            inputs,
            output_dir,
            config,
        } => cmd_batch(&inputs, &output_dir, config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn cmd_normalize(
    input: &std::path::Path,
    output: &std::path::Path,
    method: CliMethod,
    columns: Option<&str>,
    params_out: Option<&std::path::Path>,
) -> Result<()> {
    eprintln!("Loading {:?}...", input);
    let table = EventTable::from_path(input)?;
    eprintln!("Loaded {} events x {} channels", table.n_rows(), table.n_channels());

    let columns = columns.map(split_list);
    let normalized = fit_normalize(&table, method.into(), columns.as_deref())?;

    eprintln!("Writing {:?}...", output);
    normalized.table.to_path(output)?;

    if let Some(path) = params_out {
        std::fs::write(path, serde_json::to_string_pretty(&normalized.params)?)?;
        eprintln!("Wrote parameters to {:?}", path);
    }

    eprintln!("Done! Normalized {} columns", normalized.params.len());
    Ok(())
}

fn cmd_baseline(
    input: &std::path::Path,
    output: &std::path::Path,
    baseline: &str,
    columns: Option<&str>,
) -> Result<()> {
    eprintln!("Loading {:?}...", input);
    let table = EventTable::from_path(input)?;

    let samples = split_list(baseline);
    let columns = columns.map(split_list);
    eprintln!("Normalizing to baseline: {} control samples...", samples.len());
    let result = normalize_to_baseline(&table, &samples, columns.as_deref())?;

    eprintln!("Writing {:?}...", output);
    result.to_path(output)?;
    Ok(())
}

fn cmd_convert(
    input: &std::path::Path,
    output: &std::path::Path,
    column: &str,
    from: &str,
    to: &str,
) -> Result<()> {
    let table = EventTable::from_path(input)?;
    let converted = convert_units(&table, column, from, to)?;
    converted.to_path(output)?;
    eprintln!("Converted {}: {} -> {}", column, from, to);
    Ok(())
}

fn cmd_select_axes(
    input: &std::path::Path,
    n: usize,
    min_variance: f64,
    max_correlation: f64,
    sample_size: usize,
    format: &str,
) -> Result<()> {
    eprintln!("Loading {:?}...", input);
    let table = EventTable::from_path(input)?;
    eprintln!("Loaded {} events x {} channels", table.n_rows(), table.n_channels());

    let selector = AxisSelector::new()
        .with_min_variance(min_variance)
        .with_max_correlation(max_correlation)
        .with_sample_size(sample_size);
    let recommendations = selector.recommend(&table, n)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&recommendations)?),
        _ => {
            println!("Recommended channel pairs ({} of requested {}):", recommendations.len(), n);
            for (rank, rec) in recommendations.iter().enumerate() {
                println!(
                    "  {}. {} vs {}  score={:.3}  ({})",
                    rank + 1,
                    rec.x_channel,
                    rec.y_channel,
                    rec.score,
                    rec.reason
                );
            }
        }
    }
    Ok(())
}

fn cmd_shift(
    baseline_path: &std::path::Path,
    test_path: &std::path::Path,
    x_channel: &str,
    y_channel: &str,
    threshold: f64,
    format: &str,
) -> Result<()> {
    eprintln!("Loading baseline {:?}...", baseline_path);
    let baseline = EventTable::from_path(baseline_path)?;
    eprintln!("Loading test {:?}...", test_path);
    let test = EventTable::from_path(test_path)?;

    let mut detector = ShiftDetector::new();
    detector.set_baseline(&baseline, x_channel, y_channel)?;
    let report = detector.detect_scatter_shift(&test, threshold)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            println!("Scatter shift: {} / {}", x_channel, y_channel);
            println!("  X shift:   {:+.3} sd", report.x_shift);
            println!("  Y shift:   {:+.3} sd", report.y_shift);
            println!("  Magnitude: {:.3} (threshold {})", report.magnitude, report.threshold);
            println!("  P-value:   {:.4}", report.p_value);
            println!(
                "  Verdict:   {}",
                if report.is_anomaly { "ANOMALY" } else { "normal" }
            );
        }
    }
    Ok(())
}

fn cmd_outliers(
    input: &std::path::Path,
    channels: &str,
    rule: CliOutlierRule,
    threshold: f64,
    factor: f64,
    format: &str,
) -> Result<()> {
    eprintln!("Loading {:?}...", input);
    let table = EventTable::from_path(input)?;
    let channels = split_list(channels);

    let report = match rule {
        CliOutlierRule::Zscore => detect_outliers_zscore(&table, &channels, threshold)?,
        CliOutlierRule::Iqr => detect_outliers_iqr(&table, &channels, factor)?,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", report),
    }
    Ok(())
}

fn cmd_profile(input: &std::path::Path, format: &str) -> Result<()> {
    let table = EventTable::from_path(input)?;
    let profile = profile_channels(&table);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&profile)?),
        _ => print!("{}", profile),
    }
    Ok(())
}

fn cmd_run(
    config_path: &std::path::Path,
    input: &std::path::Path,
    output: &std::path::Path,
    report_path: Option<&std::path::Path>,
) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config = PipelineConfig::from_yaml(&std::fs::read_to_string(config_path)?)?;

    eprintln!("Loading {:?}...", input);
    let table = EventTable::from_path(input)?;
    eprintln!("Loaded {} events x {} channels", table.n_rows(), table.n_channels());

    eprintln!("Running pipeline '{}'...", config.name);
    let report = Pipeline::from_config(&config).run(&table)?;

    eprintln!("Writing {:?}...", output);
    report.table.to_path(output)?;

    if let Some(path) = report_path {
        std::fs::write(path, report.to_json()?)?;
        eprintln!("Wrote report to {:?}", path);
    }

    eprintln!(
        "Done! {} recommendations, {} outlier reports",
        report.recommendations.len(),
        report.outliers.len()
    );
    Ok(())
}

fn cmd_example(output: &std::path::Path) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-qc")
        .normalize(Method::Zscore)
        .select_axes(7)
        .detect_outliers_iqr(&["FSC-A", "SSC-A"], 1.5);

    let config = pipeline.to_config(Some(
        "Example pipeline: z-score normalization, axis selection, IQR outliers",
    ));
    let yaml = config.to_yaml()?;

    std::fs::write(output, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);
    Ok(())
}

fn cmd_batch(
    inputs: &[PathBuf],
    output_dir: &std::path::Path,
    config: Option<&std::path::Path>,
) -> Result<()> {
    let pipeline = match config {
        Some(path) => {
            let config = PipelineConfig::from_yaml(&std::fs::read_to_string(path)?)?;
            Pipeline::from_config(&config)
        }
        None => Pipeline::new()
            .name("batch-default")
            .normalize(Method::Zscore)
            .select_axes(7),
    };

    eprintln!("Processing {} files...", inputs.len());
    let outcomes = run_batch(inputs, output_dir, &pipeline)?;

    let n_ok = outcomes.iter().filter(|o| o.is_ok()).count();
    for outcome in &outcomes {
        match &outcome.error {
            None => eprintln!("  ok   {:?}", outcome.input),
            Some(e) => eprintln!("  FAIL {:?}: {}", outcome.input, e),
        }
    }
    eprintln!("Done! {}/{} files processed", n_ok, outcomes.len());

    if n_ok < outcomes.len() {
        std::process::exit(1);
    }
    Ok(())
}
