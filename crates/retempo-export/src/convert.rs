//! Raw PCM to WAV conversion.

use crate::error::{ExportError, Result};
use crate::format::WavStreamWriter;
use retempo_core::{ChannelLayout, PcmFormat, SampleFormat};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, Write};
use std::path::Path;

/// Copy buffer size.
const COPY_CHUNK_BYTES: usize = 8192;

/// Wrap a headerless PCM file in a canonical WAV container.
///
/// Byte rate and block align are derived from the other parameters.
/// Returns the number of payload bytes copied.
///
/// # Errors
///
/// [`ExportError::Open`] if either file cannot be opened,
/// [`ExportError::Truncated`] if the destination cannot be finalized. In the
/// latter case the destination keeps its placeholder header.
pub fn pcm_to_wav(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    sample_rate: u32,
    layout: ChannelLayout,
    bits_per_sample: u16,
) -> Result<u64> {
    let format = PcmFormat::new(
        sample_rate,
        layout,
        SampleFormat::from_bits(bits_per_sample)?,
    );
    format.validate()?;

    let src = src.as_ref();
    let dst = dst.as_ref();
    let input = File::open(src).map_err(|e| ExportError::open(src, e))?;
    let writer = WavStreamWriter::create(dst, format)?;

    let (_, copied) = convert_stream(BufReader::new(input), writer)?;
    tracing::info!(
        src = %src.display(),
        dst = %dst.display(),
        bytes = copied,
        "wrapped raw PCM in WAV container"
    );
    Ok(copied)
}

/// Stream every byte of `src` into `writer` and finalize it.
///
/// Returns the finalized inner writer and the payload length.
pub fn convert_stream<R: Read, W: Write + Seek>(
    mut src: R,
    mut writer: WavStreamWriter<W>,
) -> Result<(W, u64)> {
    let mut buf = vec![0u8; COPY_CHUNK_BYTES];
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        writer.write_pcm(&buf[..n])?;
    }
    let copied = writer.data_len();
    Ok((writer.finalize()?, copied))
}
