//! CSV Replay Integration Test
//!
//! Writes telemetry files in several dialects to a temp directory, replays
//! them through `CsvSource` + `TelemetryStream`, and checks the results
//! against the same samples fed from memory.

use std::path::{Path, PathBuf};

use flightphase::{
    CsvSource, FlightConfig, FlightError, NoiseConfig, Phase, PhaseReport, ReplaySource,
    SourceError, TelemetryStream,
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

/// Short flight: climb, fall past the failsafe time, settle on the ground.
fn flight_pairs() -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = (0..=12)
        .map(|i| {
            let t = f64::from(i);
            (t, 200.0 * t - 10.0 * t * t)
        })
        .collect();
    let mut alt: f64 = 960.0;
    let mut t = 13.0;
    while alt > 0.0 {
        alt = (alt - 40.0).max(0.0);
        pairs.push((t, alt));
        t += 1.0;
    }
    for _ in 0..5 {
        pairs.push((t, 0.0));
        t += 1.0;
    }
    pairs
}

fn write_csv(dir: &Path, name: &str, header: Option<&str>, delimiter: &str) -> PathBuf {
    let mut text = String::new();
    if let Some(h) = header {
        text.push_str(h);
        text.push('\n');
    }
    for (t, a) in flight_pairs() {
        text.push_str(&format!("{t}{delimiter}{a}\n"));
    }
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn replay_file(path: &Path) -> Vec<PhaseReport> {
    let source = CsvSource::open(path).unwrap();
    TelemetryStream::new(source, &noiseless())
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

fn replay_memory() -> Vec<PhaseReport> {
    TelemetryStream::new(ReplaySource::from_pairs(&flight_pairs()), &noiseless())
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn csv_dialects_match_in_memory_replay() {
    let dir = tempfile::tempdir().unwrap();
    let expected = replay_memory();
    assert_eq!(expected.len(), flight_pairs().len() - 1);

    let files = [
        write_csv(dir.path(), "comma.csv", Some("time,altitude"), ","),
        write_csv(dir.path(), "semicolon.csv", None, ";"),
        write_csv(dir.path(), "tab.tsv", Some("t\talt"), "\t"),
        write_csv(dir.path(), "pipe.txt", Some("time|altitude"), "|"),
        write_csv(dir.path(), "aligned.txt", None, "    "),
    ];
    for path in &files {
        assert_eq!(replay_file(path), expected, "mismatch for {}", path.display());
    }
}

#[test]
fn replayed_flight_ends_landed() {
    let reports = replay_memory();
    assert_eq!(reports.last().map(|r| r.phase), Some(Phase::Landed));
    assert!(reports.windows(2).all(|w| w[0].phase <= w[1].phase));
}

#[test]
fn header_only_file_is_empty_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("header.csv");
    std::fs::write(&path, "time,altitude\n\n").unwrap();

    let source = CsvSource::open(&path).unwrap();
    let result = TelemetryStream::new(source, &noiseless());
    assert!(matches!(result, Err(FlightError::Source(SourceError::Empty))));
}

#[test]
fn malformed_row_stops_stream_with_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    std::fs::write(&path, "time,altitude\n0,0\n1,10\n2,20\n3,thirty\n4,40\n").unwrap();

    let mut stream = TelemetryStream::new(CsvSource::open(&path).unwrap(), &noiseless()).unwrap();
    assert!(stream.next().unwrap().is_ok());
    assert!(stream.next().unwrap().is_ok());
    match stream.next() {
        Some(Err(FlightError::Source(SourceError::Format { line, .. }))) => assert_eq!(line, 5),
        other => panic!("expected format error, got {other:?}"),
    }
    assert!(stream.next().is_none());
}

#[test]
fn nan_altitude_is_a_source_error_not_an_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nan.csv");
    std::fs::write(&path, "0,0\n1,10\n2,nan\n3,30\n4,40\n5,50\n").unwrap();

    let results: Vec<_> = TelemetryStream::new(CsvSource::open(&path).unwrap(), &noiseless())
        .unwrap()
        .collect();
    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().unwrap();
    assert!(first.sample.altitude.is_finite() && first.sample.velocity.is_finite());
    assert!(matches!(
        results[1],
        Err(FlightError::Source(SourceError::Format { line: 3, .. }))
    ));
}

#[test]
fn out_of_order_time_in_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reversed.csv");
    std::fs::write(&path, "0,0\n1,10\n0.5,12\n2,20\n").unwrap();

    let results: Vec<_> = TelemetryStream::new(CsvSource::open(&path).unwrap(), &noiseless())
        .unwrap()
        .collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(FlightError::Monotonicity(e)) => {
            assert_eq!(e.previous, 1.0);
            assert_eq!(e.offending, 0.5);
        }
        other => panic!("expected monotonicity error, got {other:?}"),
    }
}

#[test]
fn binary_file_is_rejected_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flight.bin");
    std::fs::write(&path, [0x89u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0xff, 0x00]).unwrap();

    assert!(matches!(
        CsvSource::open(&path),
        Err(SourceError::Format { line: 1, .. })
    ));
}
