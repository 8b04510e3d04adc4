//! Rocket Flight Simulation
//!
//! Generates a synthetic single-flight altimeter log for testing the flight
//! phase classifier:
//! - Boost (constant thrust) and ballistic coast to apogee
//! - Drogue descent from apogee
//! - Main descent below the main deploy altitude
//! - Landed, sitting on the pad until the log ends
//!
//! Altitude readings carry Gaussian altimeter noise.
//!
//! # Usage
//! ```bash
//! ./flight-simulation --seed 7 | ./flightphase -
//! ./flight-simulation --format json --sample-rate 20 > flight.jsonl
//! ```

use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use tracing::info;

use flightphase::config::defaults::{GRAVITY_FT_S2, SIM_ALTIMETER_SIGMA_FT, SIM_SAMPLE_RATE_HZ};
use flightphase::{Phase, RawSample};

/// Parachute inflation time constant (s)
const DEPLOY_TAU_S: f64 = 1.0;
/// Hard stop for runaway profiles (s)
const MAX_FLIGHT_S: f64 = 3_600.0;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "flight-simulation")]
#[command(about = "Synthetic rocket altimeter data for flight phase testing")]
#[command(version = "1.0")]
struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Altimeter sample rate in Hz
    #[arg(long, default_value_t = SIM_SAMPLE_RATE_HZ)]
    sample_rate: f64,

    /// Altimeter noise standard deviation (ft)
    #[arg(long, default_value_t = SIM_ALTIMETER_SIGMA_FT)]
    noise: f64,

    /// Motor burn time (s)
    #[arg(long, default_value_t = 2.5)]
    burn_time: f64,

    /// Net thrust acceleration during the burn, before gravity (ft/s²)
    #[arg(long, default_value_t = 320.0)]
    thrust: f64,

    /// Drogue descent rate (ft/s)
    #[arg(long, default_value_t = 75.0)]
    drogue_rate: f64,

    /// Main deploy altitude (ft)
    #[arg(long, default_value_t = 400.0)]
    main_altitude: f64,

    /// Main descent rate (ft/s)
    #[arg(long, default_value_t = 18.0)]
    main_rate: f64,

    /// Seconds of on-the-ground data after touchdown
    #[arg(long, default_value_t = 10.0)]
    landed_duration: f64,

    /// Append the true phase as a third column / field
    #[arg(long)]
    truth: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress the flight log (only output altimeter data)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

// ============================================================================
// Flight Model
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct FlightProfile {
    burn_time: f64,
    thrust: f64,
    drogue_rate: f64,
    main_altitude: f64,
    main_rate: f64,
    landed_duration: f64,
}

struct Simulator {
    profile: FlightProfile,
    time: f64,
    altitude: f64,
    velocity: f64,
    phase: Phase,
    landed_at: Option<f64>,
    rng: StdRng,
    noise: Normal<f64>,
}

impl Simulator {
    fn new(profile: FlightProfile, sigma: f64, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            profile,
            time: 0.0,
            altitude: 0.0,
            velocity: 0.0,
            phase: Phase::Launch,
            landed_at: None,
            rng,
            noise: Normal::new(0.0, sigma).context("Invalid altimeter noise")?,
        })
    }

    /// Advance the true trajectory by `dt` seconds.
    fn step(&mut self, dt: f64) {
        let p = self.profile;
        match self.phase {
            Phase::Launch => {
                let accel = if self.time < p.burn_time {
                    p.thrust - GRAVITY_FT_S2
                } else {
                    -GRAVITY_FT_S2
                };
                self.velocity += accel * dt;
                self.altitude += self.velocity * dt;
                if self.time >= p.burn_time && self.velocity <= 0.0 {
                    self.transition(Phase::Drogue);
                }
            }
            Phase::Drogue => {
                self.velocity = approach(self.velocity, -p.drogue_rate, dt);
                self.altitude += self.velocity * dt;
                if self.altitude < p.main_altitude {
                    self.transition(Phase::Main);
                }
            }
            Phase::Main => {
                self.velocity = approach(self.velocity, -p.main_rate, dt);
                self.altitude += self.velocity * dt;
                if self.altitude <= 0.0 {
                    self.altitude = 0.0;
                    self.velocity = 0.0;
                    self.landed_at = Some(self.time);
                    self.transition(Phase::Landed);
                }
            }
            Phase::Landed => {}
        }
        self.time += dt;
    }

    fn transition(&mut self, next: Phase) {
        info!(
            time = self.time,
            altitude = self.altitude,
            velocity = self.velocity,
            "{} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }

    /// Altimeter reading of the current state.
    fn measure(&mut self) -> RawSample {
        RawSample::new(self.time, self.altitude + self.noise.sample(&mut self.rng))
    }

    fn finished(&self) -> bool {
        self.time >= MAX_FLIGHT_S
            || self
                .landed_at
                .is_some_and(|t| self.time - t >= self.profile.landed_duration)
    }
}

/// First-order lag toward `target` velocity (canopy inflation).
fn approach(velocity: f64, target: f64, dt: f64) -> f64 {
    target + (velocity - target) * (-dt / DEPLOY_TAU_S).exp()
}

// ============================================================================
// Output
// ============================================================================

fn write_sample(
    out: &mut impl Write,
    format: OutputFormat,
    sample: RawSample,
    truth: Option<Phase>,
) -> Result<()> {
    match (format, truth) {
        (OutputFormat::Csv, None) => writeln!(out, "{:.3},{:.3}", sample.time, sample.altitude)?,
        (OutputFormat::Csv, Some(phase)) => writeln!(
            out,
            "{:.3},{:.3},{}",
            sample.time, sample.altitude, phase
        )?,
        (OutputFormat::Json, None) => {
            serde_json::to_writer(&mut *out, &sample)?;
            writeln!(out)?;
        }
        (OutputFormat::Json, Some(phase)) => {
            let value = serde_json::json!({
                "time": sample.time,
                "altitude": sample.altitude,
                "phase": phase,
            });
            serde_json::to_writer(&mut *out, &value)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    anyhow::ensure!(
        args.sample_rate.is_finite() && args.sample_rate > 0.0,
        "sample rate must be positive, got {}",
        args.sample_rate
    );
    let dt = 1.0 / args.sample_rate;

    let profile = FlightProfile {
        burn_time: args.burn_time,
        thrust: args.thrust,
        drogue_rate: args.drogue_rate,
        main_altitude: args.main_altitude,
        main_rate: args.main_rate,
        landed_duration: args.landed_duration,
    };
    let mut sim = Simulator::new(profile, args.noise, args.seed)?;

    info!(
        sample_rate = args.sample_rate,
        noise_ft = args.noise,
        seed = ?args.seed,
        "Flight simulation start"
    );

    let mut out = BufWriter::new(io::stdout().lock());
    if args.format == OutputFormat::Csv {
        if args.truth {
            writeln!(out, "time,altitude,phase")?;
        } else {
            writeln!(out, "time,altitude")?;
        }
    }

    let mut samples = 0u64;
    let mut apogee = 0.0_f64;
    while !sim.finished() {
        let truth = args.truth.then_some(sim.phase);
        write_sample(&mut out, args.format, sim.measure(), truth)?;
        apogee = apogee.max(sim.altitude);
        samples += 1;
        sim.step(dt);
    }
    out.flush()?;

    info!(
        samples,
        apogee_ft = apogee,
        duration_s = sim.time,
        "Flight simulation complete"
    );
    Ok(())
}
