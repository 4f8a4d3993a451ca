//! Test helpers and fixtures for retempo integration tests.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (identity passthrough)
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `INT16_EPSILON`: One 16-bit quantization step
//! - `LENGTH_TOLERANCE`: Relative output length error for tempo changes

#![allow(dead_code)]

pub mod tolerances;

use std::path::Path;

/// Default test sample rate (the 16 kHz speech rate used on phones).
pub const TEST_SAMPLE_RATE: u32 = 16000;

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (0.5 * (2.0 * std::f64::consts::PI * frequency * t).sin()) as f32
        })
        .collect()
}

/// Generate white noise (random samples in -0.5..0.5).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / (1u64 << 31) as f32) - 0.5
        })
        .collect()
}

/// Sine plus a little noise, closer to real recordings than a pure tone.
pub fn generate_program(num_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sine = generate_sine(330.0, sample_rate as f64, num_samples);
    let noise = generate_noise(num_samples, 7);
    sine.iter().zip(&noise).map(|(s, n)| s + 0.1 * n).collect()
}

/// Duplicate a mono signal into interleaved stereo with a quieter right side.
pub fn to_stereo(mono: &[f32]) -> Vec<f32> {
    mono.iter().flat_map(|&s| [s, 0.5 * s]).collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

/// Assert `actual` is within `tolerance` (relative) of `expected`.
pub fn assert_len_near(actual: u64, expected: f64, tolerance: f64) {
    let error = (actual as f64 - expected).abs() / expected;
    assert!(
        error <= tolerance,
        "length {} differs from expected {:.1} by {:.2}% (limit {:.2}%)",
        actual,
        expected,
        error * 100.0,
        tolerance * 100.0
    );
}

// =============================================================================
// PCM and WAV fixtures
// =============================================================================

/// Quantize to 16-bit little-endian PCM bytes.
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| {
            let v = (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
            v.to_le_bytes()
        })
        .collect()
}

/// Decode 16-bit little-endian PCM bytes.
pub fn pcm16_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Write a canonical 16-bit WAV file with hound.
pub fn write_wav16(path: &Path, sample_rate: u32, channels: u16, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create fixture wav");
    for &s in samples {
        let v = (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(v).expect("write fixture sample");
    }
    writer.finalize().expect("finalize fixture wav");
}

/// Read a 16-bit WAV file with hound.
pub fn read_wav16(path: &Path) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).expect("open produced wav");
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .expect("read produced samples");
    (spec, samples)
}

/// Data chunk size declared in a canonical header.
pub fn declared_data_len(path: &Path) -> u32 {
    let bytes = std::fs::read(path).expect("read wav bytes");
    u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]])
}

/// Size of a file on disk.
pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).expect("stat file").len()
}
