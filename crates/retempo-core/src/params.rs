//! Tempo, pitch and rate validation.
//!
//! Validation is a pure function over the user-facing parameters. It runs
//! before a processing session is configured, so a rejected value never
//! leaves partial state behind.

use crate::{Error, Result};

/// Lowest accepted pitch shift in semitones (five octaves down).
pub const MIN_PITCH_SEMITONES: f32 = -60.0;
/// Highest accepted pitch shift in semitones (five octaves up).
pub const MAX_PITCH_SEMITONES: f32 = 60.0;

/// Slowest accepted tempo or rate (twenty times longer output).
pub const MIN_RATIO: f32 = 0.05;
/// Fastest accepted tempo or rate (twenty times shorter output).
pub const MAX_RATIO: f32 = 20.0;

/// Validate tempo ratio and pitch shift.
///
/// Tempo must be finite and within [`MIN_RATIO`]..=[`MAX_RATIO`]
/// (1.0 = unchanged). Pitch must be finite and within
/// [`MIN_PITCH_SEMITONES`]..=[`MAX_PITCH_SEMITONES`].
pub fn validate(tempo: f32, pitch_semitones: f32) -> Result<()> {
    validate_ratio("tempo", tempo)?;
    if !pitch_semitones.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "pitch {pitch_semitones} is not a finite number of semitones"
        )));
    }
    if !(MIN_PITCH_SEMITONES..=MAX_PITCH_SEMITONES).contains(&pitch_semitones) {
        return Err(Error::InvalidParameter(format!(
            "pitch {pitch_semitones} semitones out of range ({MIN_PITCH_SEMITONES} to {MAX_PITCH_SEMITONES})"
        )));
    }
    Ok(())
}

/// Validate a playback rate (tempo and pitch changed together). Same range
/// as tempo.
pub fn validate_rate(rate: f32) -> Result<()> {
    validate_ratio("rate", rate)
}

fn validate_ratio(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{name} {value} must be a finite number greater than zero"
        )));
    }
    if !(MIN_RATIO..=MAX_RATIO).contains(&value) {
        return Err(Error::InvalidParameter(format!(
            "{name} {value} out of range ({MIN_RATIO} to {MAX_RATIO})"
        )));
    }
    Ok(())
}

/// Convert a pitch shift in semitones to a frequency ratio: 2^(semitones/12).
#[inline]
pub fn pitch_ratio(semitones: f32) -> f64 {
    2.0_f64.powf(semitones as f64 / 12.0)
}

/// Convert a percentage change (e.g. `20.0` for "+20%") to a ratio.
#[inline]
pub fn ratio_from_percent_change(percent: f32) -> f32 {
    1.0 + percent / 100.0
}

/// Parse a percentage change such as `"+20%"`, `"-50"` or `"0%"` into a ratio.
///
/// The result is not range checked; feed it to [`validate`] before use.
pub fn parse_percent_change(text: &str) -> Result<f32> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let number = number.strip_prefix('+').unwrap_or(number);
    let percent: f32 = number.parse().map_err(|_| {
        Error::InvalidParameter(format!("'{text}' is not a percentage change"))
    })?;
    if !percent.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "'{text}' is not a finite percentage"
        )));
    }
    Ok(ratio_from_percent_change(percent))
}
