//! Altitude/Velocity Estimator
//!
//! Turns raw (time, altitude) samples into filtered (altitude, velocity) pairs
//! using only the history gathered since the current flight phase began.
//!
//! - The first three updates of a phase use backward differencing against the
//!   previous point; altitude passes through unsmoothed.
//! - From then on every update refits a cubic smoothing spline over the whole
//!   phase history and reads value and slope at the new sample's time.
//!
//! A fresh estimator is built on every phase transition, seeded with the
//! sample that confirmed the transition.

pub mod spline;

pub use spline::{Smoothing, SmoothingSpline, SplineError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{FilteredSample, RawSample};

/// Phase history size (seed included) at which the spline takes over from
/// backward differencing.
pub const MIN_SPLINE_HISTORY: usize = 4;

/// Smallest accepted `max_history` cap.
pub const MIN_HISTORY_CAP: usize = MIN_SPLINE_HISTORY + 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// Time did not advance; unreachable behind the state machine's
    /// monotonicity check.
    #[error("Degenerate interval: time {time} does not follow {previous}")]
    DegenerateInterval { previous: f64, time: f64 },

    #[error("Estimate at t={time} is not finite")]
    NonFinite { time: f64 },

    #[error("Spline fit failed: {0}")]
    Spline(#[from] SplineError),
}

/// Estimator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorSettings {
    /// Residual budget for the smoothing spline
    #[serde(default)]
    pub smoothing: Smoothing,

    /// Fit only the most recent N points of the phase (None = whole phase)
    #[serde(default)]
    pub max_history: Option<usize>,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            smoothing: Smoothing::Auto,
            max_history: None,
        }
    }
}

/// Phase-scoped estimator state.
#[derive(Debug, Clone)]
pub struct Estimator {
    times: Vec<f64>,
    altitudes: Vec<f64>,
    last: FilteredSample,
    settings: EstimatorSettings,
}

impl Estimator {
    /// Start a phase from an already filtered sample.
    pub fn new(seed: FilteredSample, settings: EstimatorSettings) -> Self {
        Self {
            times: vec![seed.time],
            altitudes: vec![seed.altitude],
            last: seed,
            settings,
        }
    }

    /// Start the first phase from the first telemetry point, at rest.
    pub fn from_raw(seed: RawSample, settings: EstimatorSettings) -> Self {
        Self::new(FilteredSample::new(seed.time, seed.altitude, 0.0), settings)
    }

    /// Add a sample and return its filtered estimate.
    ///
    /// On error the history is left as it was before the call.
    pub fn update(&mut self, time: f64, altitude: f64) -> Result<FilteredSample, EstimationError> {
        let n = self.times.len();
        let previous_time = self.times[n - 1];
        let previous_altitude = self.altitudes[n - 1];

        let dt = time - previous_time;
        if !(dt > 0.0) {
            return Err(EstimationError::DegenerateInterval {
                previous: previous_time,
                time,
            });
        }

        let use_spline = n >= MIN_SPLINE_HISTORY;
        self.times.push(time);
        self.altitudes.push(altitude);

        let estimate = if use_spline {
            self.spline_estimate(time)
        } else {
            Ok(FilteredSample::new(
                time,
                altitude,
                (altitude - previous_altitude) / dt,
            ))
        };

        let sample = match estimate {
            Ok(sample) => sample,
            Err(e) => {
                self.times.pop();
                self.altitudes.pop();
                return Err(e);
            }
        };

        tracing::debug!(
            time,
            altitude = sample.altitude,
            velocity = sample.velocity,
            history = self.times.len(),
            spline = use_spline,
            "estimate"
        );

        self.last = sample;
        Ok(sample)
    }

    fn spline_estimate(&self, time: f64) -> Result<FilteredSample, EstimationError> {
        let start = match self.settings.max_history {
            Some(cap) => self.times.len().saturating_sub(cap),
            None => 0,
        };
        let spline = SmoothingSpline::fit(
            &self.times[start..],
            &self.altitudes[start..],
            self.settings.smoothing,
        )?;
        let (altitude, velocity) = spline.evaluate(time);
        if !altitude.is_finite() || !velocity.is_finite() {
            return Err(EstimationError::NonFinite { time });
        }
        Ok(FilteredSample::new(time, altitude, velocity))
    }

    /// Number of points in the phase history, seed included.
    pub fn history_len(&self) -> usize {
        self.times.len()
    }

    /// Most recent filtered sample (the seed before any update).
    pub fn last(&self) -> FilteredSample {
        self.last
    }

    /// Time of the most recent accepted point.
    pub fn last_time(&self) -> f64 {
        self.last.time
    }

    pub fn settings(&self) -> EstimatorSettings {
        self.settings
    }
}
