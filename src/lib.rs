//! Wildwatch - wildlife species identification for camera frames.
//!
//! Frames are letterboxed into a tensor, classified by the first model tier
//! that loads (pre-trained ONNX weights, a custom CNN or a minimal CNN),
//! then sampled for diversity and calibrated against the session history.
//! The pipeline degrades to synthetic predictions instead of failing.

#![warn(missing_docs)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod inference;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod sampling;
pub mod session;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, GlobalArgs};
use config::{
    Config, OutputFormat, config_file_path, load_config_file, load_default_config,
    save_config, validate_config,
};
use inference::Frame;
use model::LoadProgress;
use output::{DetectionRecord, create_writer, summary_line};
use pipeline::{
    Detector, DirectoryFrameSource, Monitor, MonitorEvent, MonitorSummary, collect_image_files,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{info, warn};

pub use detection::{ConfidenceLevel, Detection};
pub use error::{Error, Result};

/// Main entry point for the wildwatch CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet);

    match cli.command {
        Command::Analyze { paths, format } => {
            let config = load_config(&cli.global)?;
            let format = format.unwrap_or(config.output.format);
            analyze_images(&paths, format, &cli.global, &config)
        }
        Command::Monitor {
            dir,
            interval_ms,
            max_cycles,
            format,
        } => {
            let config = load_config(&cli.global)?;
            let format = format.unwrap_or(config.output.format);
            let interval = Duration::from_millis(interval_ms.unwrap_or(config.monitor.interval_ms));
            monitor_directory(&dir, interval, max_cycles, format, &cli.global, &config)
        }
        Command::Catalog { path } => {
            let config = load_config(&cli.global)?;
            show_catalog(path.as_deref().or(config.catalog.path.as_deref()));
            Ok(())
        }
        Command::Config { action } => handle_config_command(action, &cli.global),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ONNX Runtime stays silent unless -vv.
    let filter_str = if quiet {
        "warn,ort=off"
    } else {
        match verbose {
            0 => "info,ort=off",
            1 => "debug,ort=off",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    // Detections go to stdout; logs must not interleave with them.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load, override and validate the configuration for a run.
fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => load_config_file(path)?,
        None => load_default_config()?,
    };
    if let Some(seed) = global.seed {
        config.session.rng_seed = Some(seed);
    }
    validate_config(&config)?;
    Ok(config)
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal {
            message: format!("failed to create async runtime: {e}"),
        })
}

/// Initialize a detector behind a progress bar.
fn initialize_detector(runtime: &Runtime, detector: &mut Detector, show_progress: bool) -> Result<()> {
    let pb = output::create_init_progress(show_progress);
    let callback = |progress: LoadProgress| output::apply_progress(pb.as_ref(), &progress);
    let result = runtime.block_on(detector.initialize(Some(&callback)));
    output::finish_progress(pb, if result.is_ok() { "Ready" } else { "Failed" });
    result?;

    if let Some(model) = detector.model() {
        info!(
            "Using {} ({}, estimated accuracy {:.0}%)",
            model.name,
            model.architecture_kind,
            model.accuracy_estimate * 100.0
        );
    }
    Ok(())
}

fn report_summary(detector: &Detector, format: OutputFormat) {
    let line = summary_line(&detector.stats());
    if format == OutputFormat::Text {
        println!("{line}");
    } else {
        info!("{line}");
    }
}

/// Analyze image files once each.
fn analyze_images(
    paths: &[PathBuf],
    format: OutputFormat,
    global: &GlobalArgs,
    config: &Config,
) -> Result<()> {
    let files = collect_image_files(paths)?;
    if files.is_empty() {
        return Err(Error::NoValidImageFiles);
    }
    info!("Found {} image file(s) to analyze", files.len());

    let runtime = build_runtime()?;
    let mut detector = Detector::from_config(config);
    initialize_detector(&runtime, &mut detector, !global.quiet && !global.no_progress)?;

    let mut writer = create_writer(format, std::io::stdout().lock());
    writer.write_header()?;

    let mut skipped = 0usize;
    for file in &files {
        let result = Frame::from_path(file).and_then(|frame| detector.analyze(&frame));
        match result {
            Ok(detection) => {
                let source = file.display().to_string();
                writer.write_detection(&DetectionRecord::new(&detection, Some(&source)))?;
            }
            Err(e) if e.is_frame_error() => {
                warn!("Skipping {}: {e}", file.display());
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    writer.finalize()?;

    if skipped > 0 {
        warn!("{skipped} file(s) could not be analyzed");
    }
    report_summary(&detector, format);
    Ok(())
}

/// Replay a directory of frames through the monitoring loop.
fn monitor_directory(
    dir: &Path,
    interval: Duration,
    max_cycles: Option<usize>,
    format: OutputFormat,
    global: &GlobalArgs,
    config: &Config,
) -> Result<()> {
    let source = DirectoryFrameSource::new(dir)?;
    info!("Monitoring {} frame(s) from {}", source.len(), dir.display());

    let runtime = build_runtime()?;
    let mut detector = Detector::from_config(config);
    initialize_detector(&runtime, &mut detector, !global.quiet && !global.no_progress)?;
    let detector = Arc::new(Mutex::new(detector));

    let mut monitor = Monitor::new(Arc::clone(&detector), Box::new(source), interval);
    if let Some(max) = max_cycles {
        monitor = monitor.with_max_cycles(max);
    }

    let handle = monitor.handle();
    let interrupt = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || interrupt.stop()) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let mut writer = create_writer(format, std::io::stdout().lock());
    writer.write_header()?;

    let mut write_error = None;
    let summary: MonitorSummary = runtime.block_on(monitor.run(|event| {
        if let MonitorEvent::Detection { source, detection } = event
            && write_error.is_none()
            && let Err(e) = writer.write_detection(&DetectionRecord::new(detection, Some(source)))
        {
            write_error = Some(e);
            handle.stop();
        }
    }))?;
    if let Some(e) = write_error {
        return Err(e);
    }
    writer.finalize()?;

    info!(
        "Monitoring finished: {} cycles, {} skipped ticks, {} frame errors",
        summary.cycles, summary.skipped_ticks, summary.frame_errors
    );
    let detector = detector.lock().map_err(|_| Error::Internal {
        message: "detector lock poisoned".to_string(),
    })?;
    report_summary(&detector, format);
    Ok(())
}

fn show_catalog(path: Option<&Path>) {
    let (catalog, _) = catalog::load_catalog_or_default(path);

    println!("Species catalog ({}, {} species):", catalog.source(), catalog.len());
    for species in catalog.iter() {
        let category = species
            .category
            .as_deref()
            .map_or_else(String::new, |c| format!(" [{c}]"));
        println!(
            "  {:>3}  {} ({}) - {}, {}{category}",
            species.index,
            species.name,
            species.scientific_name,
            species.habitat,
            species.conservation_status
        );
    }
}

fn handle_config_command(action: ConfigAction, global: &GlobalArgs) -> Result<()> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };

    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config_file(&path)?;
            let contents =
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerialize { source: e })?;
            print!("{contents}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
