//! Telemetry acquisition module
//!
//! Sources that feed raw (time, altitude) samples into a telemetry stream:
//! delimited text files (flight computer dumps) and in-memory replays.

mod csv_source;
mod source;

pub use csv_source::{CsvSource, Delimiter};
pub use source::{ReplaySource, SourceError, TelemetrySource};
