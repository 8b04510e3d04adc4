//! System-wide default constants.

// ============================================================================
// Configuration Lookup
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FLIGHTPHASE_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "flight_config.toml";

// ============================================================================
// Telemetry Stream
// ============================================================================

/// Relative altitude noise injected by default (0.1%).
pub const DEFAULT_NOISE_ERROR: f64 = 0.001;

// ============================================================================
// Simulation
// ============================================================================

/// Standard gravity (ft/s²).
pub const GRAVITY_FT_S2: f64 = 32.174;

/// Default altimeter sample rate for generated flights (Hz).
pub const SIM_SAMPLE_RATE_HZ: f64 = 10.0;

/// Default altimeter noise standard deviation for generated flights (ft).
pub const SIM_ALTIMETER_SIGMA_FT: f64 = 1.5;
