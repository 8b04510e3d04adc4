//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use crate::estimator::{Smoothing, MIN_HISTORY_CAP};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `FlightConfig`.
///
/// Must be kept in step with the structs in flight_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [estimator]
        "estimator",
        "estimator.smoothing",
        "estimator.max_history",
        // [noise]
        "noise",
        "noise.error",
        "noise.seed",
        // [thresholds]
        "thresholds",
        "thresholds.failsafe_time_s",
        "thresholds.main_altitude_ft",
        "thresholds.landed_velocity_ft_s",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, if any. Ties go to the
/// alphabetically first key so the suggestion is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for any unknown keys in a raw TOML string.
///
/// Parse errors are left for serde to report.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Returns (errors, warnings): errors are values the classifier cannot run
/// with, warnings are legal but unusual.
pub fn validate_physical_ranges(
    config: &super::FlightConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let noise = config.noise.error;
    if !noise.is_finite() || !(0.0..1.0).contains(&noise) {
        errors.push(format!(
            "noise.error = {noise} must be in [0, 1) (relative altitude perturbation)"
        ));
    } else if noise > 0.05 {
        warnings.push(ValidationWarning {
            field: "noise.error".to_string(),
            message: format!("noise.error = {noise} is more than 5% of altitude"),
            suggestion: None,
        });
    }

    if let Smoothing::Factor(s) = config.estimator.smoothing {
        if !s.is_finite() || s < 0.0 {
            errors.push(format!(
                "estimator.smoothing = {s} must be a non-negative number or \"auto\""
            ));
        }
    }

    if let Some(cap) = config.estimator.max_history {
        if cap < MIN_HISTORY_CAP {
            errors.push(format!(
                "estimator.max_history = {cap} must be at least {MIN_HISTORY_CAP}"
            ));
        }
    }

    let th = &config.thresholds;
    if !th.failsafe_time_s.is_finite() || th.failsafe_time_s <= 0.0 {
        errors.push(format!(
            "thresholds.failsafe_time_s = {} must be a positive number of seconds",
            th.failsafe_time_s
        ));
    }
    if !th.main_altitude_ft.is_finite() {
        errors.push(format!(
            "thresholds.main_altitude_ft = {} must be finite",
            th.main_altitude_ft
        ));
    } else if th.main_altitude_ft < 50.0 || th.main_altitude_ft > 5_000.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.main_altitude_ft".to_string(),
            message: format!(
                "main_altitude_ft = {:.1} is outside typical range (50-5000 ft)",
                th.main_altitude_ft
            ),
            suggestion: None,
        });
    }
    if !th.landed_velocity_ft_s.is_finite() {
        errors.push(format!(
            "thresholds.landed_velocity_ft_s = {} must be finite",
            th.landed_velocity_ft_s
        ));
    } else if th.landed_velocity_ft_s <= 0.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.landed_velocity_ft_s".to_string(),
            message: format!(
                "landed_velocity_ft_s = {:.2} requires a falling velocity to register Landed",
                th.landed_velocity_ft_s
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}
