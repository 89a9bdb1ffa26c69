use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value as JsonValue;

use rusty_anomaly::{
    detect_anomalies, list_columns, render_distribution, AnomalyLabel, ContaminationRate,
    DetectionConfig, ErrorReport, LoadOptions, PipelineError, PlotConfig, RenderRequest,
};

#[derive(Parser, Debug)]
#[command(name = "rusty-anomaly")]
#[command(about = "Isolation-forest anomaly detection over CSV tables", long_about = None)]
#[command(after_help = "Set RUST_LOG=debug for per-stage logging.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the normalized column names
    Columns {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Label every row as normal or anomalous and print the report
    Detect {
        #[command(flatten)]
        input: InputArgs,

        /// Columns to detect over, comma separated
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Expected anomaly fraction in (0, 0.5]
        #[arg(long)]
        contamination: Option<String>,

        /// Fixed random seed for reproducible labels
        #[arg(long)]
        seed: Option<u64>,

        /// Number of isolation trees
        #[arg(long)]
        trees: Option<usize>,

        /// JSON file holding a detection config; flags override its fields
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render a Normal/Anomaly histogram of one column to PNG
    Render {
        #[command(flatten)]
        input: InputArgs,

        /// Column plotted on the x axis
        #[arg(short, long)]
        x_axis: String,

        /// JSON array of 1/-1 codes, or a saved `detect` report
        #[arg(short, long)]
        labels: PathBuf,

        /// Columns the labels were detected over, comma separated
        #[arg(short, long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Output PNG path
        #[arg(short, long, default_value = "distribution.png")]
        out: PathBuf,

        #[arg(long)]
        bins: Option<usize>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input table (.csv)
    file: PathBuf,

    /// Field delimiter: a single ASCII character or `tab`
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
}

impl InputArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            ..LoadOptions::default()
        }
    }
}

fn parse_delimiter(raw: &str) -> std::result::Result<u8, String> {
    match raw {
        "tab" | "\\t" => Ok(b'\t'),
        _ if raw.len() == 1 && raw.is_ascii() => Ok(raw.as_bytes()[0]),
        _ => Err(format!("must be a single ASCII character, got '{raw}'")),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<PipelineError>() {
            Some(pipeline_err) => {
                let report = ErrorReport::from(pipeline_err);
                log::error!("{}", report.message);
                match serde_json::to_string(&report) {
                    Ok(json) => eprintln!("{json}"),
                    Err(_) => eprintln!("{}", report.message),
                }
                ExitCode::from(2)
            }
            None => {
                log::error!("{err:#}");
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Columns { input } => run_columns(&input),
        Commands::Detect {
            input,
            columns,
            contamination,
            seed,
            trees,
            config,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => DetectionConfig::default(),
            };
            if let Some(raw_rate) = contamination {
                config.contamination = ContaminationRate::parse(Some(&raw_rate))?.value();
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if let Some(trees) = trees {
                config.n_estimators = trees;
            }
            run_detect(&input, &columns, &config)
        }
        Commands::Render {
            input,
            x_axis,
            labels,
            columns,
            out,
            bins,
            width,
            height,
        } => {
            let mut plot = PlotConfig::default();
            if let Some(bins) = bins {
                plot.bins = bins;
            }
            if let Some(width) = width {
                plot.width = width;
            }
            if let Some(height) = height {
                plot.height = height;
            }
            let labels = read_labels(&labels)?;
            run_render(&input, &x_axis, &labels, columns.as_deref(), &plot, &out)
        }
    }
}

fn load_config(path: &Path) -> Result<DetectionConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Read an input table, insisting on a `.csv` extension.
fn read_csv_input(path: &Path) -> Result<Vec<u8>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        bail!("Invalid file format. Please upload a CSV file.");
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_columns(input: &InputArgs) -> Result<()> {
    let raw = read_csv_input(&input.file)?;
    let columns = list_columns(&raw, &input.load_options())?;
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "columns": columns }))?);
    Ok(())
}

fn run_detect(input: &InputArgs, columns: &[String], config: &DetectionConfig) -> Result<()> {
    let raw = read_csv_input(&input.file)?;
    log::info!(
        "Detecting anomalies over {columns:?} (contamination {})",
        config.contamination
    );
    let report = detect_anomalies(&raw, columns, config, &input.load_options())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_render(
    input: &InputArgs,
    x_axis: &str,
    labels: &[AnomalyLabel],
    columns: Option<&[String]>,
    plot: &PlotConfig,
    out: &Path,
) -> Result<()> {
    let raw = read_csv_input(&input.file)?;
    let request = RenderRequest {
        x_axis,
        labels,
        columns,
    };
    let png = render_distribution(&raw, &request, plot, &input.load_options())?;

    std::fs::write(out, &png).with_context(|| format!("writing {}", out.display()))?;
    log::info!("Wrote {} bytes to {}", png.len(), out.display());
    println!("{}", out.display());
    Ok(())
}

/// Labels from a bare JSON array or from the `anomalies` field of a report.
fn read_labels(path: &Path) -> Result<Vec<AnomalyLabel>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing labels JSON")?;
    let labels = match root {
        JsonValue::Array(items) => JsonValue::Array(items),
        JsonValue::Object(mut obj) => obj
            .remove("anomalies")
            .context("labels object has no 'anomalies' field")?,
        _ => bail!("expected a JSON array of labels or a detect report"),
    };
    serde_json::from_value(labels).context("labels must be 1 (normal) or -1 (anomaly)")
}
