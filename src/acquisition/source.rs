//! Telemetry source abstraction.
//!
//! Provides a unified trait for reading raw altitude samples from different
//! sources: delimited files (replay) and pre-loaded vectors (tests,
//! simulation). The telemetry stream pulls one sample per item it yields.

use thiserror::Error;

use crate::types::RawSample;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed telemetry at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("Telemetry source produced no samples")]
    Empty,
}

/// Trait abstracting where raw samples come from.
///
/// Implementations handle decoding internally.
pub trait TelemetrySource {
    /// Read the next sample.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    /// Returns `Err` when the data cannot be decoded.
    fn next_sample(&mut self) -> Result<Option<RawSample>, SourceError>;

    /// Human-readable name for logging (e.g. a file path, "replay").
    fn source_name(&self) -> &str;
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn next_sample(&mut self) -> Result<Option<RawSample>, SourceError> {
        (**self).next_sample()
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }
}

// ============================================================================
// Replay Source (in-memory)
// ============================================================================

/// Replays pre-loaded samples in order.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: std::vec::IntoIter<RawSample>,
    name: String,
}

impl ReplaySource {
    pub fn new(samples: Vec<RawSample>) -> Self {
        Self {
            samples: samples.into_iter(),
            name: "replay".to_string(),
        }
    }

    /// Build from `(time, altitude)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(pairs.iter().copied().map(RawSample::from).collect())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Samples not yet pulled.
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl TelemetrySource for ReplaySource {
    fn next_sample(&mut self) -> Result<Option<RawSample>, SourceError> {
        Ok(self.samples.next())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
