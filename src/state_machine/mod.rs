//! Flight Phase State Machine
//!
//! Classifies each telemetry sample into `Launch → Drogue → Main → Landed`.
//!
//! ## Step Pipeline
//!
//! 1. **Validation**: time must strictly exceed the last accepted time
//! 2. **Estimation**: phase-scoped estimator produces a filtered sample
//! 3. **Window update**: sample joins the 3-deep hysteresis window
//! 4. **Transition check**: full window + successor predicate → advance,
//!    reseed the estimator with this sample and clear the window
//! 5. **Output**: phase after step 4 with the sample from step 2
//!
//! A transition therefore needs three consecutive qualifying samples inside
//! one phase; a condition that flickers true for one or two samples does
//! nothing.

mod transitions;
mod window;

pub use transitions::{PhaseThresholds, Predicate, Successor, TransitionRule, TransitionTable};
pub use window::{HysteresisWindow, WINDOW_CAPACITY};

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::estimator::{EstimationError, Estimator, EstimatorSettings};
use crate::types::{Phase, PhaseReport, PhaseTransition, RawSample};

/// Time failed to advance. Fatal to the session.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("Time must strictly increase: got t={offending} after t={previous}")]
pub struct MonotonicityError {
    pub previous: f64,
    pub offending: f64,
}

/// Failure of a single `step`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error(transparent)]
    Monotonicity(#[from] MonotonicityError),

    #[error(transparent)]
    Estimation(#[from] EstimationError),
}

/// Per-session phase classifier.
///
/// Owns its estimator and window outright; only the transition table is
/// shared, and it is immutable.
#[derive(Debug, Clone)]
pub struct PhaseStateMachine {
    phase: Phase,
    estimator: Estimator,
    window: HysteresisWindow,
    table: Arc<TransitionTable>,
    settings: EstimatorSettings,
    last_time: f64,
    transitions: Vec<PhaseTransition>,
}

impl PhaseStateMachine {
    /// Start a session at `Launch` from the first telemetry point.
    pub fn new(seed: RawSample, table: Arc<TransitionTable>, settings: EstimatorSettings) -> Self {
        info!(
            time = seed.time,
            altitude = seed.altitude,
            "Phase state machine started in {}",
            Phase::Launch
        );
        Self {
            phase: Phase::Launch,
            estimator: Estimator::from_raw(seed, settings),
            window: HysteresisWindow::new(),
            table,
            settings,
            last_time: seed.time,
            transitions: Vec::new(),
        }
    }

    /// Session with the standard thresholds and estimator settings.
    pub fn with_defaults(seed: RawSample) -> Self {
        Self::new(
            seed,
            Arc::new(TransitionTable::default()),
            EstimatorSettings::default(),
        )
    }

    /// Feed one sample.
    ///
    /// On error nothing is mutated.
    pub fn step(&mut self, raw: RawSample) -> Result<PhaseReport, StepError> {
        if !(raw.time > self.last_time) {
            warn!(
                previous = self.last_time,
                offending = raw.time,
                phase = %self.phase,
                "Rejected out-of-order sample"
            );
            return Err(MonotonicityError {
                previous: self.last_time,
                offending: raw.time,
            }
            .into());
        }

        let sample = self.estimator.update(raw.time, raw.altitude)?;
        self.last_time = raw.time;
        self.window.push(sample);

        if let Some(next) = self
            .window
            .triplet()
            .and_then(|w| self.table.next_phase(self.phase, &w))
        {
            info!(
                from = %self.phase,
                to = %next,
                time = sample.time,
                altitude = sample.altitude,
                velocity = sample.velocity,
                "Phase transition"
            );
            self.transitions.push(PhaseTransition {
                from: self.phase,
                to: next,
                time: sample.time,
            });
            self.phase = next;
            self.estimator = Estimator::new(sample, self.settings);
            self.window.clear();
        }

        Ok(PhaseReport {
            phase: self.phase,
            sample,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time of the last accepted sample (the seed before any step).
    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Phase-local estimator history size, seed included.
    pub fn history_len(&self) -> usize {
        self.estimator.history_len()
    }

    /// Transitions committed so far, oldest first.
    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    pub fn table(&self) -> &Arc<TransitionTable> {
        &self.table
    }
}
