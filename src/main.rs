//! `generate-exhibits`: convert matrices into netbrot exhibit files
//!
//! Reads one or more variables from a MATLAB `.mat` (or NumPy `.npz`) file
//! and writes one JSON exhibit per matrix. A 3D variable of shape
//! `(7, 32, 32)` produces 7 exhibits.
//!
//! # Usage
//!
//! ```bash
//! generate-exhibits --variable-name matrices data.mat
//! generate-exhibits -n matrices -z max --include-average -r 100 -o out/brain.json data.mat
//! ```

use anyhow::Context;
use clap::Parser;
use netbrot_exhibits::config::ExhibitConfig;
use netbrot_exhibits::exhibit::{open_container, BoundingBox, NormKind, TracingSink};
use netbrot_exhibits::pipeline::generate_exhibits;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments for the exhibit generator
#[derive(Parser, Debug)]
#[command(
    name = "generate-exhibits",
    version,
    about = "Generate netbrot exhibit files from matrices stored in a .mat/.npz file"
)]
struct Args {
    /// Input container (.mat or .npz)
    filename: PathBuf,

    /// Basename for output files (named '{basename}-XX.json')
    #[arg(short, long, value_name = "FILE")]
    outfile: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(long)]
    overwrite: bool,

    /// Name of a variable containing matrices (repeatable)
    #[arg(short = 'n', long = "variable-name", value_name = "NAME")]
    variable_names: Vec<String>,

    /// Transpose the matrices read from the file
    #[arg(short, long)]
    transpose: bool,

    /// Normalize the matrices by their norm: 1, 2, inf, fro, nuc or max
    #[arg(short = 'z', long, value_name = "NORM")]
    normalize: Option<String>,

    /// Take the absolute value of all matrix entries
    #[arg(short = 'a', long = "abs")]
    absolute: bool,

    /// Clip matrix entries to the given minimum and maximum
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    clip: Option<Vec<f64>>,

    /// Also create an exhibit with the average of the matrices
    #[arg(long)]
    include_average: bool,

    /// Rendering bounds (in physical space) for the x coordinate
    #[arg(short = 'x', long, num_args = 2, value_names = ["XMIN", "XMAX"], allow_negative_numbers = true)]
    xlim: Option<Vec<f64>>,

    /// Rendering bounds (in physical space) for the y coordinate
    #[arg(short = 'y', long, num_args = 2, value_names = ["YMIN", "YMAX"], allow_negative_numbers = true)]
    ylim: Option<Vec<f64>>,

    /// Maximum escape radius
    #[arg(short = 'r', long = "escape-radius", allow_negative_numbers = true)]
    escape_radius: Option<f64>,

    /// JSON configuration file; command-line flags take precedence
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only show error messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .init();

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> anyhow::Result<u8> {
    if !args.filename.exists() {
        anyhow::bail!("File does not exist: '{}'.", args.filename.display());
    }

    let config = build_config(&args)?;
    config.validate()?;

    let output_base = config.output_base(&args.filename);
    info!(
        "Converting '{}' into exhibits '{}'",
        args.filename.display(),
        output_base.display()
    );

    let mut container = open_container(&args.filename)?;
    let mut sink = TracingSink;
    let report = generate_exhibits(container.as_mut(), &config, &output_base, &mut sink)?;

    info!(
        "Wrote {} exhibit(s), {} error(s)",
        report.output.len(),
        report.failures.len()
    );
    Ok(report.exit_code())
}

/// Start from the config file (or defaults) and apply command-line overrides
fn build_config(args: &Args) -> anyhow::Result<ExhibitConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ExhibitConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration '{}'", path.display()))?
        }
        None => ExhibitConfig::default(),
    };

    if !args.variable_names.is_empty() {
        config.variables = args.variable_names.clone();
    }
    if args.outfile.is_some() {
        config.output = args.outfile.clone();
    }
    if let Some(norm) = args.normalize.as_deref() {
        config.transform.normalize = Some(norm.parse::<NormKind>()?);
    }
    if let Some(clip) = pair(args.clip.as_deref()) {
        config.transform.clip = Some(clip);
    }
    if let Some(radius) = args.escape_radius {
        config.max_escape_radius = Some(radius);
    }

    config.transform.transpose |= args.transpose;
    config.transform.absolute |= args.absolute;
    config.include_average |= args.include_average;
    config.overwrite |= args.overwrite;

    if args.xlim.is_some() || args.ylim.is_some() {
        let current = config.bounding_box;
        let xlim = pair(args.xlim.as_deref())
            .unwrap_or((current.upper_left[0], current.lower_right[0]));
        let ylim = pair(args.ylim.as_deref())
            .unwrap_or((current.lower_right[1], current.upper_left[1]));
        config.bounding_box = BoundingBox::from_limits(xlim, ylim);
    }

    Ok(config)
}

/// `num_args = 2` guarantees two values when the flag is present
fn pair(values: Option<&[f64]>) -> Option<(f64, f64)> {
    match values {
        Some([a, b]) => Some((*a, *b)),
        _ => None,
    }
}
