//! Telemetry sample types: raw input, filtered output, hysteresis triplet

use serde::{Deserialize, Serialize};

use super::Phase;

/// One altimeter reading as produced by a telemetry source.
///
/// Time is in seconds since the start of the recording, altitude in feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub time: f64,
    pub altitude: f64,
}

impl RawSample {
    pub fn new(time: f64, altitude: f64) -> Self {
        Self { time, altitude }
    }
}

impl From<(f64, f64)> for RawSample {
    fn from((time, altitude): (f64, f64)) -> Self {
        Self { time, altitude }
    }
}

/// Estimator output for one sample. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilteredSample {
    pub time: f64,
    /// Smoothed altitude (ft); equal to the raw altitude while differencing
    pub altitude: f64,
    /// Vertical velocity (ft/s), positive up
    pub velocity: f64,
}

impl FilteredSample {
    pub fn new(time: f64, altitude: f64, velocity: f64) -> Self {
        Self {
            time,
            altitude,
            velocity,
        }
    }
}

/// Three consecutive filtered samples, oldest first, split by channel.
///
/// This is the view transition predicates evaluate: `times[2]` is the newest time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    pub times: [f64; 3],
    pub alts: [f64; 3],
    pub vels: [f64; 3],
}

impl Triplet {
    pub fn from_samples(samples: [FilteredSample; 3]) -> Self {
        Self {
            times: samples.map(|s| s.time),
            alts: samples.map(|s| s.altitude),
            vels: samples.map(|s| s.velocity),
        }
    }
}

/// One item of the telemetry stream: the phase after the step plus the
/// filtered sample the step produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    #[serde(flatten)]
    pub sample: FilteredSample,
}

/// A committed phase change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    /// Time of the sample that confirmed the transition
    pub time: f64,
}
