//! Tolerance constants for audio testing.
//!
//! Different checks require different precision levels.

/// Floating point rounding errors (passthrough, exact conversions).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Audio perceptual tolerance (~-60dB, inaudible differences).
pub const PERCEPTUAL_EPSILON: f32 = 0.001;

/// 16-bit quantization step size.
pub const INT16_EPSILON: f32 = 1.0 / 32768.0;

/// Relative tolerance on output length for tempo changes.
///
/// Flush trims output to the nominal length, so this only has to absorb
/// rounding of `frames / tempo`.
pub const LENGTH_TOLERANCE: f64 = 0.05;
