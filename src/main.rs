//! Keyboard Timing - record key timing to CSV
//!
//! Captures key-down and key-up events until stopped (stop key in the
//! capture window, or Ctrl+C for global capture), then writes the session
//! to a single CSV file.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use keyboard_timing::{
    capture::{self, SourceKind},
    config::Config,
    keyboard::{EventNormalizer, KeyNameResolver, MonotonicClock},
    session::{CaptureMode, CaptureSession, SessionState, StopSignal},
};

#[derive(Debug, Parser)]
#[command(name = "keyboard-timing", version, about = "Record keyboard timing to CSV")]
struct Args {
    /// Output CSV file (default: output/rust_<mode>_<os>.csv next to the executable)
    output: Option<PathBuf>,

    /// Capture context: `gui` records in an owned window, `terminal` records globally
    #[arg(long, default_value = "gui")]
    mode: CaptureMode,

    /// Capture source (auto, evdev, poll, hook, tap, window)
    #[arg(long)]
    source: Option<SourceKind>,

    /// Maximum number of events kept in memory
    #[arg(long)]
    capacity: Option<usize>,

    /// Configuration file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON session summary to stdout after writing the file
    #[arg(long)]
    summary_json: bool,

    /// Log every captured event
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(kind: SourceKind, verbose: bool) {
    // The capture window owns the terminal, so keep stderr quiet there
    let default_level = match (verbose, kind) {
        (true, _) => "debug",
        (false, SourceKind::Window) => "warn",
        (false, _) => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run(args: Args) -> Result<ExitCode> {
    let (mut config, config_error) = match &args.config {
        Some(path) => {
            let config = Config::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            (config, None)
        }
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };
    if let Some(source) = args.source {
        config.capture.source = source;
    }
    if let Some(capacity) = args.capacity {
        config.capture.capacity = capacity;
    }

    let kind = config.capture.source.resolve(args.mode);
    init_logging(kind, args.verbose);
    if let Some(e) = config_error {
        warn!("Could not load config file, using defaults: {}", e);
    }

    let mut source = capture::open_source(kind, &config)
        .with_context(|| format!("failed to initialize '{}' capture", kind))?;

    let mode = source.mode();
    if mode != args.mode {
        warn!(
            "Source '{}' captures in {} mode; ignoring --mode {}",
            source.name(),
            mode,
            args.mode
        );
    }
    let output = match args.output {
        Some(path) => path,
        None => config.default_output_path(mode, &executable_dir()),
    };
    info!("Recording with '{}' source to {}", source.name(), output.display());

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.request())
        .context("failed to install interrupt handler")?;

    let normalizer = EventNormalizer::new(
        Box::new(MonotonicClock::start()),
        KeyNameResolver::new(source.keymap(), source.probe()),
    );
    let mut session = CaptureSession::new(mode, normalizer, config.capture.capacity, stop);

    if let Err(e) = source.run(&mut session) {
        if session.state() == SessionState::Idle {
            return Err(e).with_context(|| format!("'{}' capture failed to start", source.name()));
        }
        error!("Capture ended with an error: {}", e);
    }

    match session.finish(&output) {
        Ok(summary) => {
            eprintln!("Wrote {} events to {}", summary.events, output.display());
            if args.summary_json {
                println!("{}", summary.to_json().context("failed to encode summary")?);
            }
        }
        Err(e) => error!("Failed to write {}: {}", output.display(), e),
    }

    Ok(ExitCode::SUCCESS)
}
