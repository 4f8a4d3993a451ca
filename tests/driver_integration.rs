//! Streaming driver tests: raw PCM through sinks, and the two-step
//! raw-then-wrap workflow.
//!
//! Run with:
//! ```bash
//! cargo test -p retempo --test driver_integration
//! ```

mod helpers;

use helpers::tolerances::LENGTH_TOLERANCE;
use approx::assert_relative_eq;
use helpers::*;
use proptest::prelude::*;
use retempo::prelude::*;
use retempo::{ErrorKind, StreamProgress};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use tempfile::TempDir;

fn mono_driver(tempo: f32) -> StreamDriver {
    let config = SessionConfig::new(TEST_SAMPLE_RATE, 1).tempo(tempo);
    StreamDriver::new(config, DriverOptions::default()).unwrap()
}

#[test]
fn test_raw_then_wrap_workflow() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let raw = dir.path().join("out.pcm");
    let output = dir.path().join("out.wav");

    let samples = generate_program(40_000, TEST_SAMPLE_RATE);
    write_wav16(&input, TEST_SAMPLE_RATE, 1, &samples);

    // Skip the canonical header and stream raw PCM to a scratch file.
    let config = SessionConfig::new(TEST_SAMPLE_RATE, 1).tempo(1.2);
    let options = DriverOptions::default().header_bytes(44);
    let mut driver = StreamDriver::new(config, options).unwrap();

    let source = BufReader::new(File::open(&input).unwrap());
    let mut sink = WriterSink::new(BufWriter::new(File::create(&raw).unwrap()));
    let report = driver.process_stream(source, &mut sink).unwrap();
    sink.into_inner().unwrap();

    assert_eq!(driver.last_error(), "");
    assert_eq!(report.bytes_read, 80_000);
    assert_len_near(report.frames_out, 40_000.0 / 1.2, LENGTH_TOLERANCE);
    assert_eq!(file_len(&raw), report.bytes_written);

    let wrapped = pcm_to_wav(&raw, &output, TEST_SAMPLE_RATE, ChannelLayout::Mono, 16).unwrap();
    assert_eq!(wrapped, report.bytes_written);
    assert_eq!(file_len(&output), 44 + wrapped);

    let (spec, produced) = read_wav16(&output);
    assert_eq!(spec.sample_rate, TEST_SAMPLE_RATE);
    assert_eq!(produced, pcm16_samples(&std::fs::read(&raw).unwrap()));
}

#[test]
fn test_identity_in_memory_any_chunk_size() {
    let payload = pcm16_bytes(&to_stereo(&generate_noise(5_000, 3)));

    for chunk in [4, 7, 1001, 8192, 65_536] {
        let config = SessionConfig::new(22050, 2);
        let options = DriverOptions::default().chunk_size_bytes(chunk);
        let mut driver = StreamDriver::new(config, options).unwrap();

        let mut out = Vec::new();
        let mut sink = |bytes: &[u8]| -> std::io::Result<()> {
            out.extend_from_slice(bytes);
            Ok(())
        };
        let report = driver
            .process_stream(Cursor::new(&payload), &mut sink)
            .unwrap();
        assert_eq!(report.bytes_written, payload.len() as u64, "chunk {chunk}");
        assert_eq!(out, payload, "chunk {chunk}");
    }
}

#[test]
fn test_stereo_double_tempo() {
    let payload = pcm16_bytes(&to_stereo(&generate_program(30_000, 44100)));
    let config = SessionConfig::new(44100, 2).tempo(2.0);
    let mut driver = StreamDriver::new(config, DriverOptions::default()).unwrap();

    let mut sink = WriterSink::new(Vec::new());
    let report = driver
        .process_stream(Cursor::new(&payload), &mut sink)
        .unwrap();
    let out = sink.into_inner().unwrap();

    assert_eq!(out.len() % 4, 0);
    assert_eq!(out.len() as u64, report.bytes_written);
    assert_len_near(report.frames_out, 15_000.0, LENGTH_TOLERANCE);
}

#[test]
fn test_progress_is_monotonic() {
    let payload = pcm16_bytes(&generate_program(50_000, TEST_SAMPLE_RATE));
    let total = payload.len() as u64;
    let mut driver = mono_driver(0.8);

    let mut seen: Vec<StreamProgress> = Vec::new();
    let mut discard = |_: &[u8]| -> std::io::Result<()> { Ok(()) };
    driver
        .process_stream_with_progress(Cursor::new(&payload), &mut discard, Some(total), |p| {
            seen.push(p)
        })
        .unwrap();

    assert!(seen.len() > 1);
    for pair in seen.windows(2) {
        assert!(pair[1].bytes_read >= pair[0].bytes_read);
        assert!(pair[1].bytes_written >= pair[0].bytes_written);
    }
    let last = seen.last().unwrap();
    assert_eq!(last.bytes_read, total);
    assert_relative_eq!(last.fraction().unwrap(), 1.0);
    assert_relative_eq!(seen[0].fraction().unwrap(), 8192.0 / total as f32);
}

#[test]
fn test_failure_is_reported_then_cleared() {
    let mut driver = mono_driver(1.1);

    // Header longer than the whole input.
    let mut short = StreamDriver::new(
        SessionConfig::new(TEST_SAMPLE_RATE, 1),
        DriverOptions::default().header_bytes(44),
    )
    .unwrap();
    let mut discard = |_: &[u8]| -> std::io::Result<()> { Ok(()) };
    let err = short
        .process_stream(Cursor::new(vec![0u8; 20]), &mut discard)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedInput);
    assert!(!short.last_error().is_empty());

    let mut failing = |_: &[u8]| -> std::io::Result<()> { Err(std::io::Error::other("disk full")) };
    let payload = pcm16_bytes(&generate_program(20_000, TEST_SAMPLE_RATE));
    let err = driver
        .process_stream(Cursor::new(&payload), &mut failing)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert!(driver.last_error().contains("disk full"), "{}", driver.last_error());

    driver
        .process_stream(Cursor::new(&payload), &mut discard)
        .unwrap();
    assert_eq!(driver.last_error(), "");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn identity_stream_matches_input(
        values in proptest::collection::vec(any::<i16>(), 0..4000),
        chunk in 1usize..3000,
    ) {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let config = SessionConfig::new(TEST_SAMPLE_RATE, 1);
        let options = DriverOptions::default().chunk_size_bytes(chunk);
        let mut driver = StreamDriver::new(config, options).unwrap();

        let mut sink = WriterSink::new(Vec::new());
        let report = driver.process_stream(Cursor::new(&payload), &mut sink).unwrap();
        prop_assert_eq!(report.frames_in, values.len() as u64);
        prop_assert_eq!(sink.into_inner().unwrap(), payload);
    }
}
