//! Processing session configuration.

use crate::format::{ChannelLayout, PcmFormat};
use crate::params::{pitch_ratio, validate, validate_rate};

/// Widest ratio either processing stage is asked to apply once pitch is
/// folded into tempo and rate. The accepted range is
/// `1 / MAX_VIRTUAL_RATIO ..= MAX_VIRTUAL_RATIO`.
pub const MAX_VIRTUAL_RATIO: f64 = 128.0;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Immutable configuration for one processing run.
///
/// `tempo` and `rate` are ratios (1.0 = unchanged). `tempo` changes speed
/// without touching pitch, `pitch_semitones` changes pitch without touching
/// speed, and `rate` changes both together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub tempo: f32,
    pub pitch_semitones: f32,
    pub rate: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            tempo: 1.0,
            pitch_semitones: 0.0,
            rate: 1.0,
        }
    }
}

impl SessionConfig {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            ..Default::default()
        }
    }

    /// Configuration matching a PCM stream format.
    pub fn for_format(format: &PcmFormat) -> Self {
        Self::new(format.sample_rate, format.channels())
    }

    pub fn tempo(mut self, tempo: f32) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn pitch_semitones(mut self, semitones: f32) -> Self {
        self.pitch_semitones = semitones;
        self
    }

    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidParameter(
                "sample rate must be a positive number of Hz".into(),
            ));
        }
        ChannelLayout::from_count(self.channels)?;
        validate(self.tempo, self.pitch_semitones)?;
        validate_rate(self.rate)?;
        for (name, value) in [
            ("tempo", self.virtual_tempo()),
            ("rate", self.virtual_rate()),
        ] {
            if !(1.0 / MAX_VIRTUAL_RATIO..=MAX_VIRTUAL_RATIO).contains(&value) {
                return Err(Error::InvalidParameter(format!(
                    "{name} {value:.4} after pitch compensation is out of range \
                     (1/{MAX_VIRTUAL_RATIO} to {MAX_VIRTUAL_RATIO})"
                )));
            }
        }
        Ok(())
    }

    /// Tempo seen by the time stretcher once pitch compensation is applied.
    pub fn virtual_tempo(&self) -> f64 {
        self.tempo as f64 / pitch_ratio(self.pitch_semitones)
    }

    /// Resampling ratio seen by the rate transposer.
    pub fn virtual_rate(&self) -> f64 {
        self.rate as f64 * pitch_ratio(self.pitch_semitones)
    }

    /// Overall duration scale: output frames = input frames / this.
    pub fn speed_ratio(&self) -> f64 {
        self.tempo as f64 * self.rate as f64
    }

    /// True when output should equal input sample-for-sample.
    pub fn is_identity(&self) -> bool {
        self.tempo == 1.0 && self.rate == 1.0 && self.pitch_semitones == 0.0
    }
}
