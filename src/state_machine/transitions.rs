//! Phase transition table
//!
//! Immutable mapping from each phase to its successor and the predicate the
//! hysteresis window must satisfy to advance:
//!
//! | From   | To     | Predicate (all over the window triplet)           |
//! |--------|--------|---------------------------------------------------|
//! | Launch | Drogue | newest time > failsafe, or every velocity < 0     |
//! | Drogue | Main   | every altitude < main deployment altitude         |
//! | Main   | Landed | every velocity < landed velocity                  |
//! | Landed | -      | never advances                                    |

use serde::{Deserialize, Serialize};

use crate::types::{Phase, Triplet};

/// Predicate over the hysteresis window.
pub type Predicate = fn(&Triplet, &PhaseThresholds) -> bool;

/// Numeric limits used by the transition predicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    /// Drogue failsafe: deploy once the newest sample is past this time (s)
    #[serde(default = "default_failsafe_time")]
    pub failsafe_time_s: f64,

    /// Main deployment altitude (ft)
    #[serde(default = "default_main_altitude")]
    pub main_altitude_ft: f64,

    /// Landed once every velocity is below this (ft/s, signed)
    #[serde(default = "default_landed_velocity")]
    pub landed_velocity_ft_s: f64,
}

fn default_failsafe_time() -> f64 {
    15.0
}
fn default_main_altitude() -> f64 {
    200.0
}
fn default_landed_velocity() -> f64 {
    1.0
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            failsafe_time_s: default_failsafe_time(),
            main_altitude_ft: default_main_altitude(),
            landed_velocity_ft_s: default_landed_velocity(),
        }
    }
}

/// Descending, or the barometer-failure failsafe time has passed.
fn drogue_condition(w: &Triplet, th: &PhaseThresholds) -> bool {
    w.times[2] > th.failsafe_time_s || w.vels.iter().all(|&v| v < 0.0)
}

/// Low enough that the main chute will not drift far.
fn main_condition(w: &Triplet, th: &PhaseThresholds) -> bool {
    w.alts.iter().all(|&a| a < th.main_altitude_ft)
}

/// Signed comparison: steady descent under the main also satisfies it, so
/// Landed usually follows Main within three samples.
fn landed_condition(w: &Triplet, th: &PhaseThresholds) -> bool {
    w.vels.iter().all(|&v| v < th.landed_velocity_ft_s)
}

/// Successor phase together with the condition for entering it.
#[derive(Clone, Copy)]
pub struct Successor {
    pub phase: Phase,
    pub predicate: Predicate,
}

impl std::fmt::Debug for Successor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Successor").field("phase", &self.phase).finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub phase: Phase,
    /// None for the terminal phase
    pub successor: Option<Successor>,
}

impl TransitionRule {
    fn advancing(phase: Phase, next: Phase, predicate: Predicate) -> Self {
        Self {
            phase,
            successor: Some(Successor {
                phase: next,
                predicate,
            }),
        }
    }

    fn terminal(phase: Phase) -> Self {
        Self {
            phase,
            successor: None,
        }
    }
}

/// One rule per phase, indexed in flight order.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    rules: [TransitionRule; 4],
    thresholds: PhaseThresholds,
}

impl TransitionTable {
    pub fn new(thresholds: PhaseThresholds) -> Self {
        Self {
            rules: [
                TransitionRule::advancing(Phase::Launch, Phase::Drogue, drogue_condition),
                TransitionRule::advancing(Phase::Drogue, Phase::Main, main_condition),
                TransitionRule::advancing(Phase::Main, Phase::Landed, landed_condition),
                TransitionRule::terminal(Phase::Landed),
            ],
            thresholds,
        }
    }

    pub fn rule(&self, phase: Phase) -> &TransitionRule {
        &self.rules[phase as usize]
    }

    pub fn successor(&self, phase: Phase) -> Option<Phase> {
        self.rule(phase).successor.map(|s| s.phase)
    }

    /// The phase to advance to if the window satisfies the successor's predicate.
    pub fn next_phase(&self, phase: Phase, window: &Triplet) -> Option<Phase> {
        self.rule(phase)
            .successor
            .filter(|s| (s.predicate)(window, &self.thresholds))
            .map(|s| s.phase)
    }

    pub fn thresholds(&self) -> &PhaseThresholds {
        &self.thresholds
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::new(PhaseThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(times: [f64; 3], alts: [f64; 3], vels: [f64; 3]) -> Triplet {
        Triplet { times, alts, vels }
    }

    #[test]
    fn test_table_is_a_linear_chain() {
        let table = TransitionTable::default();
        for phase in Phase::ALL {
            assert_eq!(table.rule(phase).phase, phase);
        }
        assert_eq!(table.successor(Phase::Launch), Some(Phase::Drogue));
        assert_eq!(table.successor(Phase::Drogue), Some(Phase::Main));
        assert_eq!(table.successor(Phase::Main), Some(Phase::Landed));
        assert_eq!(table.successor(Phase::Landed), None);
    }

    #[test]
    fn test_drogue_on_descent_or_failsafe() {
        let table = TransitionTable::default();
        let descending = window([5.0, 6.0, 7.0], [900.0, 880.0, 850.0], [-1.0, -2.0, -3.0]);
        let mixed = window([5.0, 6.0, 7.0], [900.0, 910.0, 905.0], [-1.0, 2.0, -3.0]);
        let late = window([14.0, 15.0, 15.5], [900.0, 910.0, 915.0], [10.0, 8.0, 5.0]);
        let exactly_failsafe = window([13.0, 14.0, 15.0], [900.0, 910.0, 915.0], [10.0, 8.0, 5.0]);

        assert_eq!(table.next_phase(Phase::Launch, &descending), Some(Phase::Drogue));
        assert_eq!(table.next_phase(Phase::Launch, &mixed), None);
        assert_eq!(table.next_phase(Phase::Launch, &late), Some(Phase::Drogue));
        assert_eq!(table.next_phase(Phase::Launch, &exactly_failsafe), None);
    }

    #[test]
    fn test_main_below_deployment_altitude() {
        let table = TransitionTable::default();
        let low = window([40.0, 41.0, 42.0], [199.0, 150.0, 120.0], [-30.0; 3]);
        let straddling = window([40.0, 41.0, 42.0], [210.0, 190.0, 170.0], [-30.0; 3]);
        assert_eq!(table.next_phase(Phase::Drogue, &low), Some(Phase::Main));
        assert_eq!(table.next_phase(Phase::Drogue, &straddling), None);
    }

    #[test]
    fn test_landed_on_low_velocity_and_terminal_never_advances() {
        let table = TransitionTable::default();
        let still = window([80.0, 81.0, 82.0], [0.5, 0.4, 0.5], [0.2, -0.1, 0.0]);
        let bouncing = window([80.0, 81.0, 82.0], [0.5, 3.0, 0.5], [0.2, 2.5, -2.5]);
        assert_eq!(table.next_phase(Phase::Main, &still), Some(Phase::Landed));
        assert_eq!(table.next_phase(Phase::Main, &bouncing), None);
        assert_eq!(table.next_phase(Phase::Landed, &still), None);
    }

    #[test]
    fn test_landed_comparison_is_signed() {
        let table = TransitionTable::default();
        let descending_under_main = window([42.3, 42.4, 42.5], [191.0, 189.5, 188.0], [-15.0; 3]);
        assert_eq!(
            table.next_phase(Phase::Main, &descending_under_main),
            Some(Phase::Landed)
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let table = TransitionTable::new(PhaseThresholds {
            failsafe_time_s: 30.0,
            main_altitude_ft: 500.0,
            landed_velocity_ft_s: 0.5,
        });
        let late = window([14.0, 15.0, 16.0], [900.0; 3], [5.0; 3]);
        let mid = window([50.0, 51.0, 52.0], [450.0, 400.0, 350.0], [-40.0; 3]);
        assert_eq!(table.next_phase(Phase::Launch, &late), None);
        assert_eq!(table.next_phase(Phase::Drogue, &mid), Some(Phase::Main));
        assert_eq!(table.thresholds().landed_velocity_ft_s, 0.5);
    }
}
