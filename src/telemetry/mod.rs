//! Telemetry Stream
//!
//! Lazy, forward-only iterator that drives a `PhaseStateMachine` from a
//! `TelemetrySource`:
//!
//! ```text
//! source.next_sample() → [noise] → machine.step() → PhaseReport
//! ```
//!
//! Construction pulls the first sample to seed the machine, so the stream
//! yields one report per *subsequent* sample. The first error is handed to
//! the caller and the stream is fused after it; nothing is retried.

mod noise;

pub use noise::NoiseInjector;

use std::iter::FusedIterator;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::acquisition::{SourceError, TelemetrySource};
use crate::config::FlightConfig;
use crate::estimator::EstimationError;
use crate::state_machine::{MonotonicityError, PhaseStateMachine, StepError, TransitionTable};
use crate::types::PhaseReport;

/// Anything that can end a flight session.
#[derive(Error, Debug)]
pub enum FlightError {
    #[error("Telemetry source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Monotonicity(#[from] MonotonicityError),

    #[error("Estimation failed: {0}")]
    Estimation(#[from] EstimationError),
}

impl From<StepError> for FlightError {
    fn from(e: StepError) -> Self {
        match e {
            StepError::Monotonicity(e) => FlightError::Monotonicity(e),
            StepError::Estimation(e) => FlightError::Estimation(e),
        }
    }
}

pub struct TelemetryStream<S> {
    source: S,
    machine: PhaseStateMachine,
    noise: Option<NoiseInjector>,
    finished: bool,
}

impl<S: TelemetrySource> TelemetryStream<S> {
    /// Seed a state machine from the source's first sample.
    pub fn new(mut source: S, config: &FlightConfig) -> Result<Self, FlightError> {
        let mut noise = NoiseInjector::new(config.noise.error, config.noise.seed);

        let first = source.next_sample()?.ok_or(SourceError::Empty)?;
        let seed = match noise.as_mut() {
            Some(n) => n.apply(first),
            None => first,
        };

        info!(
            source = source.source_name(),
            noise = config.noise.error,
            smoothing = %config.estimator.smoothing,
            "Telemetry stream started"
        );

        let table = Arc::new(TransitionTable::new(config.thresholds));
        let machine = PhaseStateMachine::new(seed, table, config.estimator);

        Ok(Self {
            source,
            machine,
            noise,
            finished: false,
        })
    }

    /// Stream with built-in defaults (0.1% noise from entropy).
    pub fn with_defaults(source: S) -> Result<Self, FlightError> {
        Self::new(source, &FlightConfig::default())
    }

    pub fn machine(&self) -> &PhaseStateMachine {
        &self.machine
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }

    /// Hand back the source and the machine state.
    pub fn into_parts(self) -> (S, PhaseStateMachine) {
        (self.source, self.machine)
    }

    fn advance(&mut self) -> Result<Option<PhaseReport>, FlightError> {
        let Some(raw) = self.source.next_sample()? else {
            return Ok(None);
        };
        let raw = match self.noise.as_mut() {
            Some(n) => n.apply(raw),
            None => raw,
        };
        let report = self.machine.step(raw)?;
        Ok(Some(report))
    }
}

impl<S: TelemetrySource> Iterator for TelemetryStream<S> {
    type Item = Result<PhaseReport, FlightError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(report)) => Some(Ok(report)),
            Ok(None) => {
                self.finished = true;
                info!(
                    source = self.source.source_name(),
                    phase = %self.machine.phase(),
                    transitions = self.machine.transitions().len(),
                    "Telemetry stream exhausted"
                );
                None
            }
            Err(e) => {
                self.finished = true;
                debug!(error = %e, "Telemetry stream stopped on error");
                Some(Err(e))
            }
        }
    }
}

impl<S: TelemetrySource> FusedIterator for TelemetryStream<S> {}
