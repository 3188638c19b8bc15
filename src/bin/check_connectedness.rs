//! `check-connectedness`: report graph connectivity of stacked adjacency matrices
//!
//! # Usage
//!
//! ```bash
//! check-connectedness --variable-name matrices data.mat
//! check-connectedness -n matrices --clip 0.1 1e9 data.mat
//! ```

use clap::Parser;
use netbrot_exhibits::config::ConnectivityConfig;
use netbrot_exhibits::connectivity::check_connectivity;
use netbrot_exhibits::exhibit::{open_container, TracingSink};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Command-line arguments for the connectivity checker
#[derive(Parser, Debug)]
#[command(
    name = "check-connectedness",
    version,
    about = "Check the connectedness of graphs given by matrices in a .mat/.npz file"
)]
struct Args {
    /// Input container (.mat or .npz)
    filename: PathBuf,

    /// Name of a 3D variable containing adjacency matrices (repeatable)
    #[arg(short = 'n', long = "variable-name", value_name = "NAME")]
    variable_names: Vec<String>,

    /// Clip matrix entries to the given minimum and maximum [default: 0 inf]
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    clip: Option<Vec<f64>>,

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

    let config = ConnectivityConfig {
        variables: args.variable_names,
        clip: match args.clip.as_deref() {
            Some([min, max]) => Some((*min, *max)),
            _ => None,
        },
    };

    let mut container = open_container(&args.filename)?;
    let mut sink = TracingSink;
    let report = check_connectivity(container.as_mut(), &config, &mut sink);

    Ok(report.exit_code())
}
