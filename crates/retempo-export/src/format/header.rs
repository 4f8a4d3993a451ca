//! Canonical 44-byte RIFF/WAVE header.

use crate::error::{ExportError, Result};
use retempo_core::PcmFormat;

/// Size of the canonical header.
pub const WAV_HEADER_LEN: usize = 44;

/// Offset of the RIFF chunk size field.
pub(crate) const RIFF_SIZE_OFFSET: u64 = 4;

/// Largest payload whose RIFF size still fits in 32 bits.
pub const MAX_DATA_LEN: u64 = u32::MAX as u64 - (WAV_HEADER_LEN as u64 - 8);

const WAVE_FORMAT_PCM: u16 = 1;

/// Header fields. Byte rate and block align are derived from `format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: PcmFormat,
    pub data_len: u32,
}

impl WavHeader {
    pub fn new(format: PcmFormat, data_len: u32) -> Self {
        Self { format, data_len }
    }

    /// Header with zero sizes, written before the payload length is known.
    pub fn placeholder(format: PcmFormat) -> Self {
        Self::new(format, 0)
    }

    /// RIFF chunk size: everything after the first 8 bytes.
    pub fn riff_len(&self) -> u32 {
        self.data_len
            .saturating_add(WAV_HEADER_LEN as u32 - 8)
    }

    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let f = &self.format;
        let mut out = [0u8; WAV_HEADER_LEN];
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&self.riff_len().to_le_bytes());
        out[8..12].copy_from_slice(b"WAVE");
        out[12..16].copy_from_slice(b"fmt ");
        out[16..20].copy_from_slice(&16u32.to_le_bytes());
        out[20..22].copy_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        out[22..24].copy_from_slice(&f.channels().to_le_bytes());
        out[24..28].copy_from_slice(&f.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&f.byte_rate().to_le_bytes());
        out[32..34].copy_from_slice(&f.block_align().to_le_bytes());
        out[34..36].copy_from_slice(&f.bits_per_sample().to_le_bytes());
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&self.data_len.to_le_bytes());
        out
    }

    /// Parse a canonical header (`fmt ` immediately followed by `data`).
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(ExportError::Truncated(format!(
                "WAV header needs {WAV_HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at =
            |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(ExportError::UnsupportedFormat("not a RIFF/WAVE file".into()));
        }
        if &bytes[12..16] != b"fmt " || u32_at(16) != 16 || &bytes[36..40] != b"data" {
            return Err(ExportError::UnsupportedFormat(
                "not a canonical 44-byte WAV header".into(),
            ));
        }
        if u16_at(20) != WAVE_FORMAT_PCM {
            return Err(ExportError::UnsupportedFormat(format!(
                "format tag {} is not integer PCM",
                u16_at(20)
            )));
        }

        let format = PcmFormat::from_parts(u32_at(24), u16_at(22), u16_at(34))?;
        if u32_at(28) != format.byte_rate() || u16_at(32) != format.block_align() {
            return Err(ExportError::UnsupportedFormat(
                "byte rate or block align inconsistent with format".into(),
            ));
        }

        Ok(Self {
            format,
            data_len: u32_at(40),
        })
    }
}
