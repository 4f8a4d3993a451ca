//! Streaming WAV writer.
//!
//! The header is written first with zero sizes, payload bytes are appended
//! as they arrive, and [`WavStreamWriter::finalize`] seeks back to patch the
//! two size fields. A writer that is never finalized leaves the placeholder
//! in place, so an interrupted file is recognisable as incomplete.

use crate::error::{ExportError, Result};
use crate::format::header::{WavHeader, MAX_DATA_LEN, RIFF_SIZE_OFFSET};
use retempo_core::{PcmFormat, PcmSink};
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

pub struct WavStreamWriter<W: Write + Seek> {
    inner: W,
    format: PcmFormat,
    data_len: u64,
    encode_buf: Vec<u8>,
}

impl WavStreamWriter<BufWriter<File>> {
    /// Create (or truncate) a WAV file at `path`.
    pub fn create(path: impl AsRef<Path>, format: PcmFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| ExportError::open(path, e))?;
        Self::new(BufWriter::new(file), format)
    }
}

impl<W: Write + Seek> WavStreamWriter<W> {
    /// Write the placeholder header to `inner`.
    pub fn new(mut inner: W, format: PcmFormat) -> Result<Self> {
        format.validate()?;
        inner.write_all(&WavHeader::placeholder(format).to_bytes())?;
        Ok(Self {
            inner,
            format,
            data_len: 0,
            encode_buf: Vec::new(),
        })
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    /// Payload bytes written so far.
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Append raw PCM bytes.
    pub fn write_pcm(&mut self, pcm: &[u8]) -> Result<()> {
        let new_len = self.data_len + pcm.len() as u64;
        if new_len > MAX_DATA_LEN {
            return Err(ExportError::Truncated(format!(
                "payload of {new_len} bytes exceeds the 4 GiB WAV limit"
            )));
        }
        self.inner.write_all(pcm)?;
        self.data_len = new_len;
        Ok(())
    }

    /// Encode interleaved samples in the writer's sample format and append.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<()> {
        let mut buf = std::mem::take(&mut self.encode_buf);
        buf.clear();
        self.format.sample_format.encode(samples, &mut buf);
        let result = self.write_pcm(&buf);
        self.encode_buf = buf;
        result
    }

    /// Patch the size fields and return the inner writer.
    ///
    /// A failed seek back leaves the placeholder header in place and reports
    /// [`ExportError::Truncated`]. Both size fields are rewritten by a single
    /// write, so the header is never left half patched.
    pub fn finalize(mut self) -> Result<W> {
        self.inner.flush()?;
        let header = WavHeader::new(self.format, self.data_len as u32).to_bytes();

        self.seek_to(RIFF_SIZE_OFFSET)?;
        // Bytes 4..44: RIFF size through data size.
        self.inner
            .write_all(&header[RIFF_SIZE_OFFSET as usize..])?;
        self.inner
            .seek(SeekFrom::End(0))
            .map_err(|e| finalize_error(&e))?;
        self.inner.flush()?;

        tracing::debug!(data_len = self.data_len, "WAV header finalized");
        Ok(self.inner)
    }

    /// Give up without patching the header.
    pub fn into_unfinalized(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map(|_| ())
            .map_err(|e| finalize_error(&e))
    }
}

fn finalize_error(err: &io::Error) -> ExportError {
    ExportError::Truncated(format!("cannot seek back to finalize WAV header: {err}"))
}

impl<W: Write + Seek> PcmSink for WavStreamWriter<W> {
    fn accept(&mut self, pcm: &[u8]) -> io::Result<()> {
        self.write_pcm(pcm).map_err(|e| match e {
            ExportError::Io(io) => io,
            other => io::Error::other(other),
        })
    }
}
