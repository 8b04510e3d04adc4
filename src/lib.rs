//! Flightphase: Rocket Flight Phase Classification
//!
//! Turns a stream of barometric altimeter samples into a flight phase
//! (`Launch → Drogue → Main → Landed`) with filtered altitude and velocity.
//!
//! ## Architecture
//!
//! - **Acquisition**: telemetry sources (delimited files, in-memory replay)
//! - **Estimator**: phase-scoped smoothing spline with a differencing warm-up
//! - **State Machine**: transition table gated by a 3-sample hysteresis window
//! - **Telemetry Stream**: lazy iterator tying a source to a machine, with
//!   optional measurement noise
//!
//! ```no_run
//! use flightphase::{CsvSource, FlightConfig, TelemetryStream};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = CsvSource::open("flight.csv")?;
//! for report in TelemetryStream::new(source, &FlightConfig::load())? {
//!     let report = report?;
//!     println!("{} {:.1} ft", report.phase, report.sample.altitude);
//! }
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod config;
pub mod estimator;
pub mod state_machine;
pub mod telemetry;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, FlightConfig, NoiseConfig};

// Re-export commonly used types
pub use types::{FilteredSample, Phase, PhaseReport, PhaseTransition, RawSample, Triplet};

// Re-export sources
pub use acquisition::{CsvSource, ReplaySource, SourceError, TelemetrySource};

// Re-export estimation
pub use estimator::{EstimationError, Estimator, EstimatorSettings, Smoothing, SmoothingSpline};

// Re-export classification
pub use state_machine::{
    HysteresisWindow, MonotonicityError, PhaseStateMachine, PhaseThresholds, StepError,
    TransitionTable,
};
pub use telemetry::{FlightError, NoiseInjector, TelemetryStream};
