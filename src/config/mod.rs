//! Flight Configuration Module
//!
//! Operator-tunable settings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `FLIGHTPHASE_CONFIG` environment variable (path to TOML file)
//! 2. `flight_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The config is passed explicitly to each telemetry stream; there is no
//! process-wide instance, so independent sessions can run with different
//! settings side by side.
//!
//! ```ignore
//! let config = FlightConfig::load();
//! let stream = TelemetryStream::new(source, &config)?;
//! ```

mod flight_config;
pub mod defaults;
pub mod validation;

pub use flight_config::*;
