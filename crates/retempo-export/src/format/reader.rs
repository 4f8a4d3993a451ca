//! Header-aware WAV input.
//!
//! hound walks the chunk list, so files with extra chunks before `data`
//! (LIST, fact, bext, ...) are handled. The returned reader yields exactly
//! the bytes of the data chunk.

use crate::error::{ExportError, Result};
use retempo_core::PcmFormat;
use std::fs::File;
use std::io::{BufReader, Read, Take};
use std::path::Path;

/// An opened WAV file positioned at the start of its PCM payload.
pub struct WavInput {
    pub format: PcmFormat,
    /// Payload length in bytes.
    pub data_len: u64,
    pub reader: Take<BufReader<File>>,
}

impl WavInput {
    /// Payload length in frames.
    pub fn frames(&self) -> u64 {
        self.data_len / self.format.block_align() as u64
    }
}

impl Read for WavInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Open a PCM WAV file.
///
/// Integer PCM with 8, 16, 24 or 32 bits and one or two channels is
/// accepted. Float WAV files are rejected.
pub fn open_wav(path: impl AsRef<Path>) -> Result<WavInput> {
    let path = path.as_ref();
    let reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => ExportError::open(path, io),
        other => ExportError::from(other),
    })?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(ExportError::UnsupportedFormat(format!(
            "{}: floating-point WAV is not supported",
            path.display()
        )));
    }
    let format = PcmFormat::from_parts(spec.sample_rate, spec.channels, spec.bits_per_sample)?;
    let data_len = reader.len() as u64 * format.sample_format.bytes() as u64;

    tracing::debug!(
        path = %path.display(),
        sample_rate = format.sample_rate,
        channels = format.channels(),
        bits = format.bits_per_sample(),
        data_len,
        "opened WAV input"
    );

    Ok(WavInput {
        format,
        data_len,
        reader: reader.into_inner().take(data_len),
    })
}
