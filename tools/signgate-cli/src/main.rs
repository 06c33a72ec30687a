//! SignGate CLI: capture, recognition, and sample inspection.
//!
//! Usage:
//!   signgate capture <STREAM> --label <LABEL>     Auto-capture samples from a landmark stream
//!   signgate recognize <STREAM> --model <PATH>    Recognize gestures in a landmark stream
//!   signgate score <SAMPLE>                       Show quality metrics of a stored sample
//!   signgate info <STREAM>                        Show landmark stream information
//!   signgate validate <SAMPLES_DIR>               Check stored sample shapes
//!   signgate config                               Print the effective configuration

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use signgate_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "signgate",
    about = "Stable-window admission for gesture capture and recognition",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/signgate/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture high-quality windows of a gesture as training samples
    Capture {
        /// Landmark stream (JSONL)
        stream: PathBuf,

        /// Gesture label; samples go to <samples_dir>/<label>/
        #[arg(short, long)]
        label: String,

        /// Samples directory (overrides paths.samples_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many captures
        #[arg(long)]
        target: Option<u32>,

        /// Composite quality a window must exceed
        #[arg(long)]
        threshold: Option<f64>,

        /// Seed for reproducible augmentation
        #[arg(long)]
        seed: Option<u64>,

        /// Replay at the recorded frame rate
        #[arg(long)]
        paced: bool,
    },

    /// Recognize gestures in a landmark stream
    Recognize {
        /// Landmark stream (JSONL)
        stream: PathBuf,

        /// Template classifier artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Label map (JSON object of label -> class index)
        #[arg(short, long)]
        labels: PathBuf,

        /// Write recognitions to a JSONL transcript
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Top probability a window must exceed
        #[arg(long)]
        confidence: Option<f64>,

        /// Top/runner-up gap a window must exceed
        #[arg(long)]
        margin: Option<f64>,

        /// Replay at the recorded frame rate
        #[arg(long)]
        paced: bool,
    },

    /// Show quality metrics of a stored sample
    Score {
        /// Sample file
        path: PathBuf,
    },

    /// Show landmark stream information
    Info {
        /// Landmark stream (JSONL)
        path: PathBuf,
    },

    /// Check the shape of every stored sample
    Validate {
        /// Samples directory (defaults to paths.samples_dir)
        path: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to the standard config location
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    signgate_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Capture {
            stream,
            label,
            output,
            target,
            threshold,
            seed,
            paced,
        } => {
            commands::capture::run(
                config,
                commands::capture::CaptureArgs {
                    stream,
                    label,
                    output,
                    target,
                    threshold,
                    seed,
                    paced,
                },
            )
            .await
        }
        Commands::Recognize {
            stream,
            model,
            labels,
            transcript,
            confidence,
            margin,
            paced,
        } => {
            commands::recognize::run(
                config,
                commands::recognize::RecognizeArgs {
                    stream,
                    model,
                    labels,
                    transcript,
                    confidence,
                    margin,
                    paced,
                },
            )
            .await
        }
        Commands::Score { path } => commands::score::run(&config, path),
        Commands::Info { path } => commands::info::run(&config, path),
        Commands::Validate { path } => commands::validate::run(&config, path),
        Commands::Config { save } => commands::config::run(&config, save),
    }
}
