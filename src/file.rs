//! File-level processing: WAV in, WAV out.

use crate::cancel::CancelToken;
use crate::driver::{DriverOptions, StreamDriver, StreamProgress, StreamReport};
use crate::error::Result;
use crate::job::JobHandle;
use retempo_core::{ratio_from_percent_change, PcmFormat, PcmSink, SampleFormat, SessionConfig};
use retempo_export::{open_wav, ResampleQuality, StreamResampler, WavStreamWriter};
use retempo_stretch::StretchSettings;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

/// Builder for processing one WAV file into another.
///
/// The input header is parsed, so files with extra chunks before the
/// payload are fine. The output is written with the input's channel count
/// and bit depth, and its header is finalized only after processing
/// completes. A cancelled run leaves the placeholder header in place.
///
/// # Example
/// ```no_run
/// use retempo::ProcessBuilder;
///
/// let report = ProcessBuilder::new("speech.wav", "faster.wav")
///     .tempo_change_percent(20.0)
///     .pitch_semitones(-2.0)
///     .run()?;
/// println!("{} bytes in {:?}", report.bytes_written, report.elapsed);
/// # Ok::<(), retempo::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    input: PathBuf,
    output: PathBuf,
    tempo: f32,
    pitch_semitones: f32,
    rate: f32,
    output_sample_rate: Option<u32>,
    resample_quality: ResampleQuality,
    chunk_size_bytes: usize,
    settings: StretchSettings,
    cancel: CancelToken,
}

impl ProcessBuilder {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            tempo: 1.0,
            pitch_semitones: 0.0,
            rate: 1.0,
            output_sample_rate: None,
            resample_quality: ResampleQuality::default(),
            chunk_size_bytes: DriverOptions::default().chunk_size_bytes,
            settings: StretchSettings::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn tempo(mut self, tempo: f32) -> Self {
        self.tempo = tempo;
        self
    }

    /// Tempo as a percentage change: `20.0` plays 20% faster.
    pub fn tempo_change_percent(mut self, percent: f32) -> Self {
        self.tempo = ratio_from_percent_change(percent);
        self
    }

    pub fn pitch_semitones(mut self, semitones: f32) -> Self {
        self.pitch_semitones = semitones;
        self
    }

    /// Playback rate: tempo and pitch together.
    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Resample the result to `hz` before writing.
    pub fn output_sample_rate(mut self, hz: u32) -> Self {
        self.output_sample_rate = Some(hz);
        self
    }

    pub fn resample_quality(mut self, quality: ResampleQuality) -> Self {
        self.resample_quality = quality;
        self
    }

    pub fn chunk_size_bytes(mut self, bytes: usize) -> Self {
        self.chunk_size_bytes = bytes;
        self
    }

    pub fn stretch_settings(mut self, settings: StretchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run(self) -> Result<StreamReport> {
        self.run_with_progress(|_| {})
    }

    pub fn run_with_progress(self, on_progress: impl FnMut(StreamProgress)) -> Result<StreamReport> {
        let input = open_wav(&self.input)?;
        let format = input.format;
        let config = SessionConfig::for_format(&format)
            .tempo(self.tempo)
            .pitch_semitones(self.pitch_semitones)
            .rate(self.rate);
        let options = DriverOptions::default()
            .chunk_size_bytes(self.chunk_size_bytes)
            .sample_format(format.sample_format);
        // Validates everything before the output file is touched.
        let mut driver = StreamDriver::new(config, options)?
            .with_settings(self.settings)
            .with_cancel(self.cancel.clone());

        let out_format = PcmFormat {
            sample_rate: self.output_sample_rate.unwrap_or(format.sample_rate),
            ..format
        };
        out_format.validate()?;
        let writer = WavStreamWriter::create(&self.output, out_format)?;
        let total = Some(input.data_len);

        let (mut report, writer) = if out_format.sample_rate != format.sample_rate {
            let mut sink = ResampleSink::new(writer, &format, out_format.sample_rate, self.resample_quality)?;
            let report = driver.process_stream_with_progress(input, &mut sink, total, on_progress)?;
            let writer = if report.cancelled {
                sink.into_writer()
            } else {
                sink.finish()?
            };
            (report, writer)
        } else {
            let mut writer = writer;
            let report = driver.process_stream_with_progress(input, &mut writer, total, on_progress)?;
            (report, writer)
        };

        report.bytes_written = writer.data_len();
        report.frames_out = writer.data_len() / out_format.block_align() as u64;

        if report.cancelled {
            writer.into_unfinalized()?;
            tracing::info!(
                output = %self.output.display(),
                "cancelled; output header left unfinalized"
            );
            return Ok(report);
        }

        writer.finalize()?;
        tracing::info!(
            input = %self.input.display(),
            output = %self.output.display(),
            bytes_written = report.bytes_written,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "file processed"
        );
        Ok(report)
    }

    /// Run on a worker thread.
    ///
    /// Poll the returned handle for progress, cancel it, or wait for the
    /// final report.
    pub fn start(self) -> Result<JobHandle> {
        let (tx, rx) = crossbeam_channel::bounded(64);
        let cancel = self.cancel.clone();
        let thread = std::thread::Builder::new()
            .name("retempo-job".into())
            .spawn(move || {
                self.run_with_progress(|p| {
                    let _ = tx.try_send(p); // drop if full, the poller catches up
                })
            })?;
        Ok(JobHandle::new(rx, thread, cancel))
    }
}

/// Sink that resamples processed PCM before it reaches the WAV writer.
struct ResampleSink<W: Write + Seek> {
    writer: WavStreamWriter<W>,
    format: SampleFormat,
    resampler: StreamResampler,
    decoded: Vec<f32>,
    resampled: Vec<f32>,
}

impl<W: Write + Seek> ResampleSink<W> {
    fn new(
        writer: WavStreamWriter<W>,
        source: &PcmFormat,
        target_rate: u32,
        quality: ResampleQuality,
    ) -> Result<Self> {
        let resampler = StreamResampler::new(
            source.channels() as usize,
            source.sample_rate,
            target_rate,
            quality,
        )?;
        Ok(Self {
            writer,
            format: source.sample_format,
            resampler,
            decoded: Vec::new(),
            resampled: Vec::new(),
        })
    }

    fn finish(mut self) -> Result<WavStreamWriter<W>> {
        self.resampled.clear();
        self.resampler.finish(&mut self.resampled)?;
        self.writer.write_samples(&self.resampled)?;
        Ok(self.writer)
    }

    fn into_writer(self) -> WavStreamWriter<W> {
        self.writer
    }
}

impl<W: Write + Seek> PcmSink for ResampleSink<W> {
    fn accept(&mut self, pcm: &[u8]) -> io::Result<()> {
        self.decoded.clear();
        self.format.decode(pcm, &mut self.decoded);
        self.resampled.clear();
        self.resampler
            .process(&self.decoded, &mut self.resampled)
            .map_err(io::Error::other)?;
        self.writer
            .write_samples(&self.resampled)
            .map_err(io::Error::other)
    }
}
