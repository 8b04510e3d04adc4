//! Flight phase enumeration

use serde::{Deserialize, Serialize};

// ============================================================================
// Flight Phase
// ============================================================================

/// Flight stage of the rocket.
///
/// Variants are declared in flight order, so the derived `Ord` matches the
/// only direction the state machine ever moves: `Launch < Drogue < Main < Landed`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash,
)]
pub enum Phase {
    /// Powered ascent and coast, until apogee or the failsafe timer
    #[default]
    Launch,
    /// Descending under the drogue parachute
    Drogue,
    /// Descending under the main parachute
    Main,
    /// Stationary on the ground
    Landed,
}

impl Phase {
    /// All phases in flight order.
    pub const ALL: [Phase; 4] = [Phase::Launch, Phase::Drogue, Phase::Main, Phase::Landed];

    /// Label used in output records and logs.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Launch => "Launch",
            Phase::Drogue => "Drogue",
            Phase::Main => "Main",
            Phase::Landed => "Landed",
        }
    }

    /// True for the phase with no successor.
    pub fn is_terminal(self) -> bool {
        self == Phase::Landed
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a label does not name a phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown flight phase: {0:?}")]
pub struct UnknownPhase(pub String);

impl std::str::FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}
