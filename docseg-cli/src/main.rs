//! docseg CLI: run parameters and label image tools for segmentation training.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// docseg: run parameters and label conversion for document segmentation
#[derive(Parser, Debug)]
#[command(name = "docseg", version, about, long_about = None)]
struct Cli {
    /// Option file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate, show and export run parameters
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },
    /// Inspect class color files
    Palette {
        #[command(subcommand)]
        action: PaletteAction,
    },
    /// Convert between RGB label images and class maps
    Labels {
        #[command(subcommand)]
        action: LabelsAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ParamsAction {
    /// Write an example option file
    Init {
        /// Destination (default: params.toml)
        path: Option<PathBuf>,
    },
    /// Print the resolved parameters as JSON
    Show {
        #[command(flatten)]
        overrides: ParamsOverrides,
    },
    /// Write model_params.json into the output model directory
    Export {
        #[command(flatten)]
        overrides: ParamsOverrides,
    },
}

/// Options that take priority over the option file and environment.
#[derive(clap::Args, Debug, Default)]
struct ParamsOverrides {
    /// Override the output model directory
    #[arg(long)]
    output_model_dir: Option<PathBuf>,
    /// Override the class color file
    #[arg(long)]
    class_file: Option<PathBuf>,
    /// Override the device selector
    #[arg(long)]
    gpu: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum PaletteAction {
    /// List the classes and their colors
    Show {
        /// Class color file
        path: PathBuf,
    },
}

#[derive(clap::Subcommand, Debug)]
enum LabelsAction {
    /// RGB label image -> 16-bit class map
    ToClasses {
        /// RGB label image
        image: PathBuf,
        /// Class color file
        #[arg(long)]
        classes_file: PathBuf,
        /// Output class map (PNG)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Class map -> RGB label image
    ToImage {
        /// Grayscale class map (8 or 16 bit)
        class_map: PathBuf,
        /// Class color file
        #[arg(long)]
        classes_file: PathBuf,
        /// Output label image
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "docseg", "docseg")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "docseg.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    commands::handle_command(cli.command, cli.config.as_deref())
}
