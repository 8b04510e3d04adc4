//! Flight Regression Tests
//!
//! Drives the public API end to end with hand-built altitude profiles and
//! asserts on the phase sequence: forward-only ordering, hysteresis, the
//! failsafe timer, terminal stability and the reference launch scenario.

use std::sync::Arc;

use flightphase::{
    EstimatorSettings, FlightConfig, NoiseConfig, Phase, PhaseReport, PhaseStateMachine,
    RawSample, ReplaySource, Smoothing, StepError, TelemetryStream, TransitionTable,
};

fn noiseless() -> FlightConfig {
    FlightConfig {
        noise: NoiseConfig {
            error: 0.0,
            seed: None,
        },
        ..FlightConfig::default()
    }
}

fn interpolating_machine(seed: RawSample) -> PhaseStateMachine {
    PhaseStateMachine::new(
        seed,
        Arc::new(TransitionTable::default()),
        EstimatorSettings {
            smoothing: Smoothing::Factor(0.0),
            max_history: None,
        },
    )
}

fn run(pairs: &[(f64, f64)]) -> Vec<PhaseReport> {
    TelemetryStream::new(ReplaySource::from_pairs(pairs), &noiseless())
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

/// Parabolic climb to ~1800 ft, linear fall under drogue and main, then
/// the ground.
fn full_flight() -> Vec<(f64, f64)> {
    let mut pairs = Vec::new();
    let mut t = 0.0;
    while t < 10.0 {
        pairs.push((t, 360.0 * t - 18.0 * t * t));
        t += 0.5;
    }
    let mut alt = 360.0 * t - 18.0 * t * t;
    while alt > 0.0 {
        pairs.push((t, alt));
        let rate = if alt > 400.0 { 60.0 } else { 20.0 };
        alt -= rate * 0.5;
        t += 0.5;
    }
    for _ in 0..20 {
        pairs.push((t, 0.0));
        t += 0.5;
    }
    pairs
}

// ============================================================================
// Reference Scenario
// ============================================================================

#[test]
fn seeded_scenario_reaches_drogue_between_15_1_and_17() {
    let reports = run(&[
        (0.0, 0.0),
        (5.0, 100.0),
        (10.0, 150.0),
        (15.1, 140.0),
        (16.0, 120.0),
        (17.0, 90.0),
    ]);

    assert_eq!(reports.len(), 5);
    assert_eq!(reports[0].phase, Phase::Launch);
    assert_eq!(reports[1].phase, Phase::Launch);
    assert_eq!(reports[4].phase, Phase::Drogue);

    let first_drogue = reports
        .iter()
        .find(|r| r.phase == Phase::Drogue)
        .map(|r| r.sample.time)
        .unwrap();
    assert!((15.1..=17.0).contains(&first_drogue), "Drogue at t={first_drogue}");
}

#[test]
fn warm_up_uses_exact_backward_differences() {
    let reports = run(&[(0.0, 0.0), (1.0, 3.0), (3.0, 7.0), (4.0, 4.0)]);
    let got: Vec<(f64, f64)> = reports
        .iter()
        .map(|r| (r.sample.altitude, r.sample.velocity))
        .collect();
    assert_eq!(got, vec![(3.0, 3.0), (7.0, 2.0), (4.0, -3.0)]);
}

// ============================================================================
// Phase Ordering
// ============================================================================

#[test]
fn full_flight_visits_every_phase_in_order() {
    let reports = run(&full_flight());

    assert!(
        reports.windows(2).all(|w| w[0].phase <= w[1].phase),
        "phase moved backwards"
    );
    let mut visited: Vec<Phase> = reports.iter().map(|r| r.phase).collect();
    visited.dedup();
    assert_eq!(
        visited,
        vec![Phase::Launch, Phase::Drogue, Phase::Main, Phase::Landed]
    );
}

#[test]
fn transitions_record_confirming_sample_times() {
    let mut stream =
        TelemetryStream::new(ReplaySource::from_pairs(&full_flight()), &noiseless()).unwrap();
    let reports: Vec<PhaseReport> = stream.by_ref().map(|r| r.unwrap()).collect();

    let transitions = stream.machine().transitions().to_vec();
    assert_eq!(transitions.len(), 3);
    for tr in &transitions {
        let report = reports.iter().find(|r| r.sample.time == tr.time).unwrap();
        assert_eq!(report.phase, tr.to);
    }
    // Launch ends no later than the failsafe timer allows
    assert!(transitions[0].time <= 16.0);
}

#[test]
fn landed_is_terminal_whatever_follows() {
    let mut pairs = full_flight();
    let mut t = pairs.last().unwrap().0;
    // A bogus climb after touchdown must not reopen any phase
    for i in 1..=30 {
        t += 0.5;
        pairs.push((t, 50.0 * f64::from(i)));
    }
    let reports = run(&pairs);
    let landed_at = reports.iter().position(|r| r.phase == Phase::Landed).unwrap();
    assert!(reports[landed_at..].iter().all(|r| r.phase == Phase::Landed));
}

// ============================================================================
// Hysteresis
// ============================================================================

/// Climb until the failsafe timer moves the machine into Drogue at t=16.
fn machine_in_drogue() -> (PhaseStateMachine, f64) {
    let mut m = interpolating_machine(RawSample::new(0.0, 0.0));
    for t in 1..=16 {
        m.step(RawSample::new(f64::from(t), 100.0 * f64::from(t))).unwrap();
    }
    assert_eq!(m.phase(), Phase::Drogue);
    (m, 16.0)
}

#[test]
fn condition_true_for_two_samples_never_transitions() {
    let (mut m, mut t) = machine_in_drogue();
    for _ in 0..4 {
        for alt in [150.0, 150.0, 250.0] {
            t += 1.0;
            let r = m.step(RawSample::new(t, alt)).unwrap();
            assert_eq!(r.phase, Phase::Drogue, "flicker at t={t} advanced the phase");
        }
    }
}

#[test]
fn condition_true_for_three_samples_transitions_on_the_third() {
    let (mut m, mut t) = machine_in_drogue();
    let mut phases = Vec::new();
    for alt in [1000.0, 150.0, 150.0, 150.0] {
        t += 1.0;
        phases.push(m.step(RawSample::new(t, alt)).unwrap().phase);
    }
    assert_eq!(
        phases,
        vec![Phase::Drogue, Phase::Drogue, Phase::Drogue, Phase::Main]
    );
    assert_eq!(m.window_len(), 0);
    assert_eq!(m.history_len(), 1);
}

// ============================================================================
// Monotonicity
// ============================================================================

#[test]
fn rejected_sample_leaves_machine_untouched() {
    let mut m = interpolating_machine(RawSample::new(0.0, 0.0));
    m.step(RawSample::new(1.0, 10.0)).unwrap();
    m.step(RawSample::new(2.0, 20.0)).unwrap();

    let before = (m.phase(), m.last_time(), m.window_len(), m.history_len());
    let err = m.step(RawSample::new(2.0, 30.0)).unwrap_err();
    assert!(matches!(err, StepError::Monotonicity(_)));
    assert_eq!(
        before,
        (m.phase(), m.last_time(), m.window_len(), m.history_len())
    );

    // The session continues with a valid sample
    let r = m.step(RawSample::new(3.0, 30.0)).unwrap();
    assert_eq!(r.sample.velocity, 10.0);
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let flight = full_flight();
    assert_eq!(run(&flight), run(&flight));
}
