//! PCM stream formats and sample conversion.
//!
//! Samples travel through the engine as interleaved `f32` in `[-1.0, 1.0)`.
//! On the byte side they are little-endian integer PCM.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Integer PCM sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SampleFormat {
    /// Unsigned 8-bit, offset binary.
    U8,
    /// Signed 16-bit little-endian.
    #[default]
    I16,
    /// Signed 24-bit little-endian, packed in 3 bytes.
    I24,
    /// Signed 32-bit little-endian.
    I32,
}

impl SampleFormat {
    /// Look up the format for a bit depth.
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            8 => Ok(SampleFormat::U8),
            16 => Ok(SampleFormat::I16),
            24 => Ok(SampleFormat::I24),
            32 => Ok(SampleFormat::I32),
            other => Err(Error::InvalidParameter(format!(
                "unsupported bits per sample: {other} (expected 8, 16, 24 or 32)"
            ))),
        }
    }

    /// Bits per sample.
    pub fn bits(&self) -> u16 {
        match self {
            SampleFormat::U8 => 8,
            SampleFormat::I16 => 16,
            SampleFormat::I24 => 24,
            SampleFormat::I32 => 32,
        }
    }

    /// Bytes per sample.
    #[inline]
    pub fn bytes(&self) -> usize {
        self.bits() as usize / 8
    }

    /// Decode one sample from exactly [`bytes()`](Self::bytes) bytes.
    #[inline]
    fn decode_one(&self, b: &[u8]) -> f32 {
        match self {
            SampleFormat::U8 => (b[0] as f64 / 128.0 - 1.0) as f32,
            SampleFormat::I16 => i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0,
            SampleFormat::I24 => {
                // Place the 3 bytes in the upper part of an i32 to sign-extend.
                let v = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
                (v as f64 / 8_388_608.0) as f32
            }
            SampleFormat::I32 => {
                (i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64 / 2_147_483_648.0) as f32
            }
        }
    }

    #[inline]
    fn encode_one(&self, sample: f32, out: &mut Vec<u8>) {
        let s = sample as f64;
        match self {
            SampleFormat::U8 => out.push(saturate(s * 128.0 + 128.0, 0.0, 255.0) as u8),
            SampleFormat::I16 => {
                let v = saturate(s * 32768.0, -32768.0, 32767.0) as i16;
                out.extend_from_slice(&v.to_le_bytes());
            }
            SampleFormat::I24 => {
                let v = saturate(s * 8_388_608.0, -8_388_608.0, 8_388_607.0) as i32;
                out.extend_from_slice(&v.to_le_bytes()[..3]);
            }
            SampleFormat::I32 => {
                let v = saturate(s * 2_147_483_648.0, -2_147_483_648.0, 2_147_483_647.0) as i32;
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    /// Decode little-endian PCM bytes, appending samples to `out`.
    ///
    /// Returns the number of samples decoded. Trailing bytes that do not
    /// form a whole sample are ignored.
    pub fn decode(&self, bytes: &[u8], out: &mut Vec<f32>) -> usize {
        let width = self.bytes();
        let count = bytes.len() / width;
        out.reserve(count);
        out.extend(bytes.chunks_exact(width).map(|b| self.decode_one(b)));
        count
    }

    /// Encode samples as little-endian PCM bytes, appending to `out`.
    ///
    /// Values are rounded and saturated to the integer range.
    pub fn encode(&self, samples: &[f32], out: &mut Vec<u8>) {
        out.reserve(samples.len() * self.bytes());
        for &sample in samples {
            self.encode_one(sample, out);
        }
    }
}

/// Round and clamp to `[min, max]`.
#[inline]
fn saturate(value: f64, min: f64, max: f64) -> f64 {
    value.round().clamp(min, max)
}

/// Channel layout. Only mono and interleaved stereo are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelLayout {
    #[default]
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn from_count(channels: u16) -> Result<Self> {
        match channels {
            1 => Ok(ChannelLayout::Mono),
            2 => Ok(ChannelLayout::Stereo),
            other => Err(Error::InvalidParameter(format!(
                "unsupported channel count: {other} (expected 1 or 2)"
            ))),
        }
    }

    pub fn count(&self) -> u16 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// Complete description of a PCM byte stream.
///
/// Byte rate and block align are always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub layout: ChannelLayout,
    pub sample_format: SampleFormat,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            layout: ChannelLayout::Stereo,
            sample_format: SampleFormat::I16,
        }
    }
}

impl PcmFormat {
    pub fn new(sample_rate: u32, layout: ChannelLayout, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            layout,
            sample_format,
        }
    }

    /// Build from raw header-style fields, validating each.
    pub fn from_parts(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Result<Self> {
        let format = Self {
            sample_rate,
            layout: ChannelLayout::from_count(channels)?,
            sample_format: SampleFormat::from_bits(bits_per_sample)?,
        };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidParameter("sample rate must be positive".into()));
        }
        if self
            .sample_rate
            .checked_mul(self.block_align() as u32)
            .is_none()
        {
            return Err(Error::InvalidParameter(format!(
                "sample rate {} Hz gives a byte rate that does not fit in 32 bits",
                self.sample_rate
            )));
        }
        Ok(())
    }

    pub fn channels(&self) -> u16 {
        self.layout.count()
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.sample_format.bits()
    }

    /// Bytes per frame: channels * bytes per sample.
    pub fn block_align(&self) -> u16 {
        self.channels() * (self.bits_per_sample() / 8)
    }

    /// Bytes per second: sample rate * block align.
    ///
    /// Saturates for formats that fail [`validate`](Self::validate).
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(self.block_align() as u32)
    }
}
