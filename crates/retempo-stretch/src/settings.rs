//! Time-stretch tuning parameters.

use retempo_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tempo at which the automatic sequence/seek lengths reach their maximum.
const AUTO_TEMPO_LOW: f64 = 0.5;
/// Tempo at which the automatic sequence/seek lengths reach their minimum.
const AUTO_TEMPO_HIGH: f64 = 2.0;

const AUTO_SEQUENCE_MS_AT_LOW: f64 = 90.0;
const AUTO_SEQUENCE_MS_AT_HIGH: f64 = 40.0;
const AUTO_SEEK_MS_AT_LOW: f64 = 20.0;
const AUTO_SEEK_MS_AT_HIGH: f64 = 15.0;

/// Smallest overlap, in frames.
const MIN_OVERLAP_FRAMES: usize = 16;

/// Overlap-add stretcher and anti-alias filter settings.
///
/// `None` for `sequence_ms` or `seek_window_ms` derives the value from the
/// tempo: slow tempos get long sequences, fast tempos get short ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchSettings {
    /// Length of one processing sequence in milliseconds.
    pub sequence_ms: Option<f32>,
    /// Width of the window searched for the best overlap position.
    pub seek_window_ms: Option<f32>,
    /// Crossfade length between consecutive sequences.
    pub overlap_ms: f32,
    /// Coarse-then-fine overlap search instead of a full scan.
    pub quick_seek: bool,
    /// Low-pass the signal around the rate transposer.
    pub anti_alias: bool,
    /// Anti-alias FIR length (multiple of 4).
    pub anti_alias_taps: usize,
}

impl Default for StretchSettings {
    fn default() -> Self {
        Self {
            sequence_ms: None,
            seek_window_ms: None,
            overlap_ms: 8.0,
            quick_seek: false,
            anti_alias: true,
            anti_alias_taps: 64,
        }
    }
}

impl StretchSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence_ms(mut self, ms: f32) -> Self {
        self.sequence_ms = Some(ms);
        self
    }

    pub fn seek_window_ms(mut self, ms: f32) -> Self {
        self.seek_window_ms = Some(ms);
        self
    }

    pub fn overlap_ms(mut self, ms: f32) -> Self {
        self.overlap_ms = ms;
        self
    }

    pub fn quick_seek(mut self, enabled: bool) -> Self {
        self.quick_seek = enabled;
        self
    }

    pub fn anti_alias(mut self, enabled: bool) -> Self {
        self.anti_alias = enabled;
        self
    }

    pub fn anti_alias_taps(mut self, taps: usize) -> Self {
        self.anti_alias_taps = taps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("sequence", self.sequence_ms),
            ("seek window", self.seek_window_ms),
            ("overlap", Some(self.overlap_ms)),
        ] {
            if let Some(ms) = value {
                if !ms.is_finite() || ms <= 0.0 {
                    return Err(Error::InvalidParameter(format!(
                        "{name} length {ms} ms must be positive"
                    )));
                }
            }
        }
        if self.anti_alias_taps < 4 || self.anti_alias_taps % 4 != 0 {
            return Err(Error::InvalidParameter(format!(
                "anti-alias filter length {} must be a positive multiple of 4",
                self.anti_alias_taps
            )));
        }
        Ok(())
    }

    /// Resolve millisecond settings into frame counts for a given tempo.
    pub fn resolve(&self, sample_rate: u32, tempo: f64) -> StretchLengths {
        let rate = sample_rate as f64;
        let sequence_ms = self.sequence_ms.map(f64::from).unwrap_or_else(|| {
            auto_length(tempo, AUTO_SEQUENCE_MS_AT_LOW, AUTO_SEQUENCE_MS_AT_HIGH)
        });
        let seek_ms = self
            .seek_window_ms
            .map(f64::from)
            .unwrap_or_else(|| auto_length(tempo, AUTO_SEEK_MS_AT_LOW, AUTO_SEEK_MS_AT_HIGH));

        let mut overlap = (rate * self.overlap_ms as f64 / 1000.0) as usize;
        overlap = overlap.max(MIN_OVERLAP_FRAMES);
        overlap -= overlap % 8;

        let sequence = ((rate * sequence_ms / 1000.0) as usize).max(2 * overlap);
        let seek = ((rate * seek_ms / 1000.0) as usize).max(1);

        StretchLengths {
            sequence,
            seek,
            overlap,
        }
    }
}

/// Linear interpolation between the low-tempo and high-tempo lengths,
/// clamped to that range.
fn auto_length(tempo: f64, at_low: f64, at_high: f64) -> f64 {
    let slope = (at_high - at_low) / (AUTO_TEMPO_HIGH - AUTO_TEMPO_LOW);
    let value = at_low + slope * (tempo - AUTO_TEMPO_LOW);
    value.clamp(at_high.min(at_low), at_high.max(at_low))
}

/// Stretcher window lengths in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StretchLengths {
    pub sequence: usize,
    pub seek: usize,
    pub overlap: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_auto_length_endpoints() {
        assert_relative_eq!(auto_length(0.5, 90.0, 40.0), 90.0);
        assert_relative_eq!(auto_length(2.0, 90.0, 40.0), 40.0);
        assert_relative_eq!(auto_length(1.25, 90.0, 40.0), 65.0);
        // clamped outside the range
        assert_relative_eq!(auto_length(0.1, 90.0, 40.0), 90.0);
        assert_relative_eq!(auto_length(8.0, 20.0, 15.0), 15.0);
    }

    #[test]
    fn test_resolve_at_44100() {
        let lengths = StretchSettings::default().resolve(44100, 1.0);
        // 8 ms = 352.8 frames, rounded down to a multiple of 8
        assert_eq!(lengths.overlap, 352);
        assert_eq!(lengths.overlap % 8, 0);
        // sequence at tempo 1.0 is 90 - 50/1.5 * 0.5 = 73.33 ms
        assert!((3233..=3234).contains(&lengths.sequence));
        assert!(lengths.seek > 0);
    }

    #[test]
    fn test_resolve_enforces_minimums() {
        let lengths = StretchSettings::default()
            .overlap_ms(0.1)
            .sequence_ms(0.1)
            .resolve(8000, 1.0);
        assert_eq!(lengths.overlap, MIN_OVERLAP_FRAMES);
        assert_eq!(lengths.sequence, 2 * MIN_OVERLAP_FRAMES);
    }

    #[test]
    fn test_explicit_lengths_override_auto() {
        let lengths = StretchSettings::default()
            .sequence_ms(50.0)
            .seek_window_ms(10.0)
            .resolve(16000, 3.0);
        assert_eq!(lengths.sequence, 800);
        assert_eq!(lengths.seek, 160);
    }

    #[test]
    fn test_validate() {
        assert!(StretchSettings::default().validate().is_ok());
        assert!(StretchSettings::default().overlap_ms(0.0).validate().is_err());
        assert!(StretchSettings::default().sequence_ms(f32::NAN).validate().is_err());
        assert!(StretchSettings::default().anti_alias_taps(30).validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let settings: StretchSettings = serde_json::from_str(r#"{ "quick_seek": true }"#).unwrap();
        assert!(settings.quick_seek);
        assert_eq!(settings.sequence_ms, None);
        assert_eq!(settings.anti_alias_taps, 64);
    }
}
