//! Shared data structures for flight phase classification
//!
//! - `RawSample`: (time, altitude) as read from a telemetry source
//! - `FilteredSample`: estimator output with smoothed altitude and velocity
//! - `Triplet`: the hysteresis window as seen by transition predicates
//! - `Phase`: the four flight stages, in order

mod phase;
mod sample;

pub use phase::*;
pub use sample::*;
