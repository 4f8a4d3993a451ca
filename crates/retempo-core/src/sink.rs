//! Output delivery.
//!
//! Produced PCM bytes are pushed into a [`PcmSink`]. Closures and any
//! [`Write`] (through [`WriterSink`]) can serve as sinks.

use std::io::{self, Write};

/// Destination for produced PCM bytes.
///
/// Called synchronously from the processing loop, so implementations should
/// not block for long.
pub trait PcmSink {
    /// Accept a block of whole PCM frames.
    fn accept(&mut self, pcm: &[u8]) -> io::Result<()>;
}

impl<F> PcmSink for F
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    fn accept(&mut self, pcm: &[u8]) -> io::Result<()> {
        self(pcm)
    }
}

/// Adapts any [`Write`] into a [`PcmSink`].
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Total bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flush and return the wrapped writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> PcmSink for WriterSink<W> {
    fn accept(&mut self, pcm: &[u8]) -> io::Result<()> {
        self.inner.write_all(pcm)?;
        self.bytes_written += pcm.len() as u64;
        Ok(())
    }
}
