//! CLI argument definitions.

use super::validators::{parse_interval_ms, parse_positive};
use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Wildlife species identification for camera frames and still images.
#[derive(Debug, Parser)]
#[command(name = "wildwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by all subcommands.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Identify species in image files or directories.
    Analyze {
        /// Input images or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format (text, json, csv).
        #[arg(short, long, env = "WILDWATCH_FORMAT")]
        format: Option<OutputFormat>,
    },
    /// Poll a directory of frames at a fixed interval.
    Monitor {
        /// Directory whose images are replayed as frames.
        dir: PathBuf,

        /// Milliseconds between cycles.
        #[arg(long, value_parser = parse_interval_ms, env = "WILDWATCH_INTERVAL_MS")]
        interval_ms: Option<u64>,

        /// Stop after this many cycles.
        #[arg(long, value_parser = parse_positive)]
        max_cycles: Option<usize>,

        /// Output format (text, json, csv).
        #[arg(short, long, env = "WILDWATCH_FORMAT")]
        format: Option<OutputFormat>,
    },
    /// List the species catalog.
    Catalog {
        /// Catalog JSON file (defaults to the configured or built-in one).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Options accepted before or after any subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity (-v: debug, -vv: trace and ONNX Runtime logs).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "WILDWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed for reproducible sampling.
    #[arg(long, global = true, env = "WILDWATCH_SEED")]
    pub seed: Option<u64>,

    /// Disable the model loading progress bar.
    #[arg(long, global = true)]
    pub no_progress: bool,
}
