//! Streaming driver: bytes in, processed bytes out.
//!
//! The driver reads fixed-size chunks from any [`Read`] source, decodes them
//! to samples, pushes them through a [`Processor`] and hands every ready
//! block to a [`PcmSink`]. At end of input it flushes the processor and
//! drains the tail through the same sink.

use crate::cancel::CancelToken;
use crate::error::Result;
use retempo_core::{Error as CoreError, ErrorSlot, PcmSink, SampleFormat, SessionConfig};
use retempo_stretch::{Processor, StretchSettings};
use serde::{Deserialize, Serialize};
use std::io::{self, ErrorKind, Read};
use std::time::{Duration, Instant};

/// Frames pulled from the processor per `receive_samples` call.
const RECEIVE_BLOCK_FRAMES: usize = 4096;

/// How the driver reads its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    /// Bytes read per chunk.
    pub chunk_size_bytes: usize,
    /// Leading bytes to skip (44 for a canonical WAV header).
    pub header_bytes: u64,
    /// Encoding of both input and output bytes.
    pub sample_format: SampleFormat,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            chunk_size_bytes: 8192,
            header_bytes: 0,
            sample_format: SampleFormat::I16,
        }
    }
}

impl DriverOptions {
    pub fn chunk_size_bytes(mut self, bytes: usize) -> Self {
        self.chunk_size_bytes = bytes;
        self
    }

    pub fn header_bytes(mut self, bytes: u64) -> Self {
        self.header_bytes = bytes;
        self
    }

    pub fn sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = format;
        self
    }

    pub fn validate(&self) -> retempo_core::Result<()> {
        if self.chunk_size_bytes == 0 {
            return Err(CoreError::InvalidParameter(
                "chunk size must be at least one byte".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one [`StreamDriver::process_stream`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamReport {
    /// Payload bytes read, excluding the skipped header.
    pub bytes_read: u64,
    /// Bytes delivered to the sink.
    pub bytes_written: u64,
    pub frames_in: u64,
    pub frames_out: u64,
    pub elapsed: Duration,
    /// Stopped early on cancellation; the processor was not flushed.
    pub cancelled: bool,
}

/// Progress snapshot, reported after every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProgress {
    pub bytes_read: u64,
    /// Payload size when known up front.
    pub total_bytes: Option<u64>,
    pub bytes_written: u64,
}

impl StreamProgress {
    /// Fraction of input consumed, if the total is known.
    pub fn fraction(&self) -> Option<f32> {
        self.total_bytes
            .filter(|&total| total > 0)
            .map(|total| (self.bytes_read as f64 / total as f64).min(1.0) as f32)
    }
}

/// Runs one processing session over a byte stream.
///
/// ```
/// use retempo::{DriverOptions, StreamDriver};
/// use retempo_core::SessionConfig;
///
/// let config = SessionConfig::new(16000, 1).tempo(2.0);
/// let mut driver = StreamDriver::new(config, DriverOptions::default()).unwrap();
///
/// let input = vec![0u8; 32000];
/// let mut output = Vec::new();
/// let mut sink = |pcm: &[u8]| -> std::io::Result<()> {
///     output.extend_from_slice(pcm);
///     Ok(())
/// };
/// let report = driver.process_stream(&input[..], &mut sink).unwrap();
/// assert_eq!(report.bytes_written, 16000);
/// assert_eq!(driver.last_error(), "");
/// ```
pub struct StreamDriver {
    config: SessionConfig,
    options: DriverOptions,
    settings: StretchSettings,
    cancel: Option<CancelToken>,
    errors: ErrorSlot,
}

impl StreamDriver {
    /// Validates both configuration and options; nothing is read yet.
    pub fn new(config: SessionConfig, options: DriverOptions) -> Result<Self> {
        config.validate()?;
        options.validate()?;
        Ok(Self {
            config,
            options,
            settings: StretchSettings::default(),
            cancel: None,
            errors: ErrorSlot::new(),
        })
    }

    /// Override stretcher tuning.
    pub fn with_settings(mut self, settings: StretchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Check `token` between chunks.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Description of the most recent failure, or `""`.
    pub fn last_error(&self) -> &str {
        self.errors.last_error()
    }

    pub fn process_stream<R, S>(&mut self, input: R, sink: &mut S) -> Result<StreamReport>
    where
        R: Read,
        S: PcmSink + ?Sized,
    {
        self.process_stream_with_progress(input, sink, None, |_| {})
    }

    /// Like [`process_stream`](Self::process_stream), calling `on_progress`
    /// after every chunk.
    pub fn process_stream_with_progress<R, S>(
        &mut self,
        input: R,
        sink: &mut S,
        total_bytes: Option<u64>,
        on_progress: impl FnMut(StreamProgress),
    ) -> Result<StreamReport>
    where
        R: Read,
        S: PcmSink + ?Sized,
    {
        let result = self.run(input, sink, total_bytes, on_progress);
        if let Err(e) = &result {
            tracing::error!(error = %e, "stream processing failed");
        }
        self.errors.track(result)
    }

    fn run<R, S>(
        &self,
        mut input: R,
        sink: &mut S,
        total_bytes: Option<u64>,
        mut on_progress: impl FnMut(StreamProgress),
    ) -> Result<StreamReport>
    where
        R: Read,
        S: PcmSink + ?Sized,
    {
        let started = Instant::now();
        let format = self.options.sample_format;
        let channels = self.config.channels as usize;
        let block_align = channels * format.bytes();

        let mut processor = Processor::with_settings(self.settings);
        processor.configure(self.config)?;

        skip_header(&mut input, self.options.header_bytes)?;

        tracing::info!(
            sample_rate = self.config.sample_rate,
            channels,
            tempo = self.config.tempo,
            pitch_semitones = self.config.pitch_semitones,
            rate = self.config.rate,
            chunk_size = self.options.chunk_size_bytes,
            "processing stream"
        );

        let mut report = StreamReport::default();
        let mut delivery = Delivery::new(format, channels);
        let mut chunk = vec![0u8; self.options.chunk_size_bytes];
        // Bytes of an incomplete frame carried into the next chunk.
        let mut pending: Vec<u8> = Vec::with_capacity(block_align);
        let mut samples: Vec<f32> = Vec::new();

        loop {
            if self.is_cancelled() {
                tracing::warn!(
                    bytes_read = report.bytes_read,
                    buffered_frames = processor.frames_available(),
                    "cancelled; discarding buffered output"
                );
                report.cancelled = true;
                report.frames_in = processor.input_frames();
                report.elapsed = started.elapsed();
                return Ok(report);
            }

            let n = read_full(&mut input, &mut chunk)?;
            if n == 0 {
                break;
            }
            report.bytes_read += n as u64;

            pending.extend_from_slice(&chunk[..n]);
            let whole = pending.len() / block_align * block_align;
            samples.clear();
            format.decode(&pending[..whole], &mut samples);
            pending.drain(..whole);

            processor.put_samples(&samples)?;
            delivery.drain(&mut processor, sink, &mut report)?;

            tracing::debug!(
                bytes = n,
                frames_ready = report.frames_out,
                "chunk processed"
            );
            on_progress(StreamProgress {
                bytes_read: report.bytes_read,
                total_bytes,
                bytes_written: report.bytes_written,
            });
        }

        if !pending.is_empty() {
            tracing::warn!(
                bytes = pending.len(),
                "dropping trailing bytes that do not form a whole frame"
            );
        }

        processor.flush()?;
        delivery.drain(&mut processor, sink, &mut report)?;

        report.frames_in = processor.input_frames();
        report.elapsed = started.elapsed();
        tracing::info!(
            bytes_read = report.bytes_read,
            bytes_written = report.bytes_written,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "stream processed"
        );
        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Scratch buffers for moving processor output into a sink.
struct Delivery {
    format: SampleFormat,
    channels: usize,
    samples: Vec<f32>,
    bytes: Vec<u8>,
}

impl Delivery {
    fn new(format: SampleFormat, channels: usize) -> Self {
        Self {
            format,
            channels,
            samples: vec![0.0; RECEIVE_BLOCK_FRAMES * channels],
            bytes: Vec::new(),
        }
    }

    fn drain<S: PcmSink + ?Sized>(
        &mut self,
        processor: &mut Processor,
        sink: &mut S,
        report: &mut StreamReport,
    ) -> Result<()> {
        loop {
            let frames = processor.receive_samples(&mut self.samples);
            if frames == 0 {
                return Ok(());
            }
            self.bytes.clear();
            self.format
                .encode(&self.samples[..frames * self.channels], &mut self.bytes);
            sink.accept(&self.bytes)?;
            report.frames_out += frames as u64;
            report.bytes_written += self.bytes.len() as u64;
        }
    }
}

/// Discard exactly `len` leading bytes.
fn skip_header<R: Read>(input: &mut R, len: u64) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut input.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        return Err(CoreError::TruncatedInput(format!(
            "input ended after {skipped} of {len} header bytes"
        ))
        .into());
    }
    Ok(())
}

/// Fill `buf` unless the input ends first. Returns bytes read.
fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retempo_core::ErrorKind as Kind;

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn collect(
        driver: &mut StreamDriver,
        input: &[u8],
    ) -> (Result<StreamReport>, Vec<u8>) {
        let mut out = Vec::new();
        let mut sink = |pcm: &[u8]| -> io::Result<()> {
            out.extend_from_slice(pcm);
            Ok(())
        };
        let result = driver.process_stream(input, &mut sink);
        (result, out)
    }

    /// Source that hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct FailAfter {
        remaining: usize,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(ErrorKind::ConnectionReset, "source went away"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(0);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_identity_copies_payload() {
        let samples: Vec<i16> = (0..5000).map(|i| ((i * 37) % 65536 - 32768) as i16).collect();
        let payload = pcm16(&samples);
        let mut input = vec![0xAA; 44];
        input.extend_from_slice(&payload);

        let options = DriverOptions::default().header_bytes(44).chunk_size_bytes(1000);
        let mut driver = StreamDriver::new(SessionConfig::new(8000, 2), options).unwrap();
        let (report, out) = collect(&mut driver, &input);
        let report = report.unwrap();

        assert_eq!(out, payload);
        assert_eq!(report.bytes_read, payload.len() as u64);
        assert_eq!(report.bytes_written, payload.len() as u64);
        assert_eq!(report.frames_in, 2500);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_short_reads_carry_partial_frames() {
        let samples: Vec<i16> = (0..3001).map(|i| i as i16).collect();
        let payload = pcm16(&samples);
        let options = DriverOptions::default().chunk_size_bytes(7);
        let mut driver = StreamDriver::new(SessionConfig::new(8000, 2), options).unwrap();

        let mut out = Vec::new();
        let mut sink = |pcm: &[u8]| -> io::Result<()> {
            out.extend_from_slice(pcm);
            Ok(())
        };
        let report = driver
            .process_stream(Trickle { data: &payload, step: 3 }, &mut sink)
            .unwrap();
        // The final odd sample is not a whole stereo frame.
        assert_eq!(out, &payload[..payload.len() - 2]);
        assert_eq!(report.frames_out, 1500);
    }

    #[test]
    fn test_tempo_scales_byte_count() {
        let input = pcm16(&vec![1000; 48_000]);
        let config = SessionConfig::new(16000, 1).tempo(1.2);
        let mut driver = StreamDriver::new(config, DriverOptions::default()).unwrap();
        let (report, out) = collect(&mut driver, &input);
        let report = report.unwrap();
        assert_eq!(report.frames_out, 40_000);
        assert_eq!(out.len(), 80_000);
    }

    #[test]
    fn test_read_error_is_io_failure() {
        let mut driver =
            StreamDriver::new(SessionConfig::new(8000, 1), DriverOptions::default()).unwrap();
        let mut sink = |_: &[u8]| -> io::Result<()> { Ok(()) };
        let err = driver
            .process_stream(FailAfter { remaining: 10_000 }, &mut sink)
            .unwrap_err();
        assert_eq!(err.kind(), Kind::IoFailure);
        assert!(driver.last_error().contains("source went away"));
    }

    #[test]
    fn test_sink_error_is_io_failure() {
        let mut driver =
            StreamDriver::new(SessionConfig::new(8000, 1), DriverOptions::default()).unwrap();
        let mut sink = |_: &[u8]| -> io::Result<()> { Err(io::Error::other("disk full")) };
        let err = driver.process_stream(&[0u8; 100][..], &mut sink).unwrap_err();
        assert_eq!(err.kind(), Kind::IoFailure);
        assert!(driver.last_error().contains("disk full"));
    }

    #[test]
    fn test_short_header_is_truncated() {
        let options = DriverOptions::default().header_bytes(44);
        let mut driver = StreamDriver::new(SessionConfig::new(8000, 1), options).unwrap();
        let (result, out) = collect(&mut driver, &[0u8; 20]);
        assert_eq!(result.unwrap_err().kind(), Kind::TruncatedInput);
        assert!(out.is_empty());
    }

    #[test]
    fn test_error_then_success_clears_last_error() {
        let mut driver =
            StreamDriver::new(SessionConfig::new(8000, 1), DriverOptions::default()).unwrap();
        let mut failing = |_: &[u8]| -> io::Result<()> { Err(io::Error::other("nope")) };
        assert!(driver.process_stream(&[0u8; 64][..], &mut failing).is_err());
        assert!(!driver.last_error().is_empty());

        let (result, _) = collect(&mut driver, &[0u8; 64]);
        result.unwrap();
        assert_eq!(driver.last_error(), "");
    }

    #[test]
    fn test_cancel_between_chunks_skips_flush() {
        let token = CancelToken::new();
        let options = DriverOptions::default().chunk_size_bytes(4096);
        let mut driver = StreamDriver::new(SessionConfig::new(16000, 1).tempo(0.5), options)
            .unwrap()
            .with_cancel(token.clone());

        let input = vec![0u8; 64_000];
        let mut discard = |_: &[u8]| -> io::Result<()> { Ok(()) };
        let mut chunks_seen = 0;
        let report = driver
            .process_stream_with_progress(&input[..], &mut discard, None, |_| {
                chunks_seen += 1;
                if chunks_seen == 3 {
                    token.cancel();
                }
            })
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.bytes_read, 3 * 4096);
        // Without the flush the output falls short of input / tempo.
        assert!(report.frames_out < 2 * report.frames_in);
        assert_eq!(driver.last_error(), "");
    }

    #[test]
    fn test_progress_fraction() {
        let progress = StreamProgress {
            bytes_read: 50,
            total_bytes: Some(200),
            bytes_written: 0,
        };
        assert_eq!(progress.fraction(), Some(0.25));
        let unknown = StreamProgress {
            total_bytes: None,
            ..progress
        };
        assert_eq!(unknown.fraction(), None);
    }

    #[test]
    fn test_rejects_bad_options() {
        let err = StreamDriver::new(
            SessionConfig::new(8000, 1),
            DriverOptions::default().chunk_size_bytes(0),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), Kind::InvalidParameter);

        let err = StreamDriver::new(SessionConfig::new(8000, 1).tempo(-1.0), DriverOptions::default())
            .err()
            .unwrap();
        assert_eq!(err.kind(), Kind::InvalidParameter);
    }
}
