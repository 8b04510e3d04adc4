//! Flightphase - rocket flight phase classifier
//!
//! Replays altimeter telemetry and reports the flight phase together with
//! filtered altitude and velocity for every sample.
//!
//! # Usage
//!
//! ```bash
//! # Replay a flight computer dump
//! flightphase flight.csv
//!
//! # Pipe a synthetic flight through without measurement noise
//! flight-simulation --seed 7 | flightphase - --error 0
//!
//! # JSON lines, transitions only
//! flightphase flight.csv --format json --quiet
//! ```
//!
//! # Environment Variables
//!
//! - `FLIGHTPHASE_CONFIG`: Path to a TOML config (default: ./flight_config.toml)
//! - `FLIGHTPHASE_LOG_FORMAT`: `pretty` or `json` log lines on stderr
//! - `RUST_LOG`: Logging level (default: info)

use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use flightphase::{
    CsvSource, FlightConfig, Phase, PhaseReport, Smoothing, TelemetrySource, TelemetryStream,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "flightphase")]
#[command(about = "Classify rocket flight phases from altimeter telemetry")]
#[command(version)]
struct CliArgs {
    /// Telemetry file with time and altitude in the first two columns ("-" reads stdin)
    file: PathBuf,

    /// TOML config file (overrides FLIGHTPHASE_CONFIG and ./flight_config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relative altitude noise injected before filtering (0 disables)
    #[arg(short, long)]
    error: Option<f64>,

    /// Spline smoothing: residual budget in ft² or "auto"
    #[arg(short, long)]
    smoothing: Option<Smoothing>,

    /// Seed for the noise generator
    #[arg(long)]
    seed: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only print phase changes
    #[arg(short, long)]
    quiet: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, env = "FLIGHTPHASE_LOG_FORMAT")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

// ============================================================================
// Setup
// ============================================================================

/// Logs go to stderr; stdout carries classification output only.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// File settings first, then command-line overrides.
fn resolve_config(args: &CliArgs) -> Result<FlightConfig> {
    let mut config = match &args.config {
        Some(path) => FlightConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FlightConfig::load(),
    };

    if let Some(error) = args.error {
        config.noise.error = error;
    }
    if let Some(smoothing) = args.smoothing {
        config.estimator.smoothing = smoothing;
    }
    if let Some(seed) = args.seed {
        config.noise.seed = Some(seed);
    }

    config.validate().context("Invalid settings")?;
    Ok(config)
}

fn open_source(file: &Path) -> Result<Box<dyn TelemetrySource>> {
    if file == Path::new("-") {
        let source = CsvSource::from_reader(BufReader::new(io::stdin()), "stdin")
            .context("stdin is not correctly formed telemetry")?;
        return Ok(Box::new(source));
    }
    let source = CsvSource::open(file)
        .with_context(|| format!("File {} is not a correctly formed CSV", file.display()))?;
    Ok(Box::new(source))
}

// ============================================================================
// Output
// ============================================================================

fn write_report(
    out: &mut impl Write,
    report: &PhaseReport,
    changed: bool,
    args: &CliArgs,
) -> Result<()> {
    match args.format {
        OutputFormat::Text => {
            if changed {
                writeln!(out, "Switching to {} state", report.phase)?;
            }
            if !args.quiet {
                writeln!(
                    out,
                    "Time: {:.3}; Altitude: {:.3}; Velocity: {:.3};",
                    report.sample.time, report.sample.altitude, report.sample.velocity
                )?;
            }
        }
        OutputFormat::Json => {
            if changed || !args.quiet {
                serde_json::to_writer(&mut *out, report)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_format);

    let config = resolve_config(&args)?;
    let source = open_source(&args.file)?;
    let stream = TelemetryStream::new(source, &config).context("Cannot start telemetry stream")?;

    let mut out = BufWriter::new(io::stdout().lock());
    let mut last_phase: Option<Phase> = None;
    let mut samples = 0usize;

    for report in stream {
        let report = report.with_context(|| {
            format!("Telemetry stream stopped after {samples} samples")
        })?;
        let changed = last_phase != Some(report.phase);
        last_phase = Some(report.phase);
        samples += 1;
        write_report(&mut out, &report, changed, &args)?;
    }
    out.flush()?;

    info!(
        samples,
        final_phase = %last_phase.unwrap_or_default(),
        "Replay complete"
    );
    Ok(())
}
