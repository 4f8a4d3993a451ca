//! Processing session: configuration, push/pull protocol and state machine.

use crate::fifo::FifoSampleBuffer;
use crate::settings::StretchSettings;
use crate::stage::Stage;
use crate::stretcher::TimeStretcher;
use crate::transposer::RateTransposer;
use retempo_core::{Error, ErrorSlot, Result, SessionConfig};
use std::fmt;

/// Silence pushed per iteration while flushing.
const FLUSH_BLOCK_FRAMES: usize = 256;

/// Ratios closer to 1.0 than this are treated as identity.
const IDENTITY_EPSILON: f64 = 1e-6;

/// Lifecycle of a [`Processor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No configuration yet.
    Unconfigured,
    /// Configured, no input received.
    Configured,
    /// Input has been pushed.
    Accepting,
    /// Flushed, output still pending.
    Draining,
    /// Flushed and fully drained.
    Drained,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Configured => "configured",
            SessionState::Accepting => "accepting input",
            SessionState::Draining => "draining",
            SessionState::Drained => "drained",
        };
        f.write_str(name)
    }
}

/// Streaming tempo/pitch processor.
///
/// Samples are interleaved `f32`. Push input with [`put_samples`], pull
/// whatever is ready with [`receive_samples`], and call [`flush`] once the
/// input ends to release the buffered tail.
///
/// ```
/// use retempo_core::SessionConfig;
/// use retempo_stretch::Processor;
///
/// let mut processor = Processor::new();
/// processor.configure(SessionConfig::new(16000, 1).tempo(1.25)).unwrap();
/// processor.put_samples(&vec![0.0; 16000]).unwrap();
/// processor.flush().unwrap();
///
/// let mut out = vec![0.0; 1024];
/// let mut total = 0;
/// loop {
///     let n = processor.receive_samples(&mut out);
///     if n == 0 {
///         break;
///     }
///     total += n;
/// }
/// assert_eq!(total, 12800);
/// ```
///
/// [`put_samples`]: Processor::put_samples
/// [`receive_samples`]: Processor::receive_samples
/// [`flush`]: Processor::flush
pub struct Processor {
    settings: StretchSettings,
    config: Option<SessionConfig>,
    channels: usize,
    stages: Vec<Box<dyn Stage>>,
    output: FifoSampleBuffer,
    state: SessionState,
    /// Frames accepted by `put_samples`.
    frames_in: u64,
    /// Frames ever placed in the output queue.
    frames_produced: u64,
    /// Frames handed out by `receive_samples`.
    frames_received: u64,
    errors: ErrorSlot,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    pub fn new() -> Self {
        Self::with_settings(StretchSettings::default())
    }

    /// Processor using custom stretcher tuning.
    pub fn with_settings(settings: StretchSettings) -> Self {
        Self {
            settings,
            config: None,
            channels: 1,
            stages: Vec::new(),
            output: FifoSampleBuffer::new(1),
            state: SessionState::Unconfigured,
            frames_in: 0,
            frames_produced: 0,
            frames_received: 0,
            errors: ErrorSlot::new(),
        }
    }

    /// Create and configure in one step.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        let mut processor = Self::new();
        processor.configure(config)?;
        Ok(processor)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn settings(&self) -> &StretchSettings {
        &self.settings
    }

    /// Description of the most recent failure, or `""`.
    pub fn last_error(&self) -> &str {
        self.errors.last_error()
    }

    /// Start a new session.
    ///
    /// Allowed before any input has been pushed and after the previous
    /// session drained. Parameters are validated before anything changes.
    pub fn configure(&mut self, config: SessionConfig) -> Result<()> {
        let result = self.try_configure(config);
        self.errors.track(result)
    }

    fn try_configure(&mut self, config: SessionConfig) -> Result<()> {
        if matches!(self.state, SessionState::Accepting | SessionState::Draining) {
            return Err(Error::InvalidState(format!(
                "cannot reconfigure while {}; clear or drain the session first",
                self.state
            )));
        }
        config.validate()?;
        self.settings.validate()?;

        let channels = config.channels as usize;
        self.stages = build_pipeline(&config, &self.settings);
        self.channels = channels;
        self.output = FifoSampleBuffer::new(channels);
        self.config = Some(config);
        self.state = SessionState::Configured;
        self.reset_counters();

        let stage_names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        tracing::debug!(
            sample_rate = config.sample_rate,
            channels,
            tempo = config.tempo,
            pitch_semitones = config.pitch_semitones,
            rate = config.rate,
            stages = ?stage_names,
            "session configured"
        );
        Ok(())
    }

    /// Append interleaved input samples.
    ///
    /// `samples.len()` must be a whole number of frames. Output may or may
    /// not become available; the stretcher works on fixed-size sequences.
    pub fn put_samples(&mut self, samples: &[f32]) -> Result<()> {
        let result = self.try_put_samples(samples);
        self.errors.track(result)
    }

    fn try_put_samples(&mut self, samples: &[f32]) -> Result<()> {
        match self.state {
            SessionState::Unconfigured => {
                return Err(Error::InvalidState(
                    "put_samples called before configure".into(),
                ))
            }
            SessionState::Draining | SessionState::Drained => {
                return Err(Error::InvalidState(format!(
                    "put_samples called after flush (session is {})",
                    self.state
                )))
            }
            SessionState::Configured | SessionState::Accepting => {}
        }
        if samples.len() % self.channels != 0 {
            return Err(Error::InvalidParameter(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                self.channels
            )));
        }

        self.state = SessionState::Accepting;
        let frames = samples.len() / self.channels;
        self.frames_in += frames as u64;

        match self.stages.first_mut() {
            None => {
                self.output.put_samples(samples);
                self.frames_produced += frames as u64;
            }
            Some(first) => {
                first.input_mut().put_samples(samples);
                self.run_pipeline();
            }
        }
        Ok(())
    }

    /// Copy up to `output.len() / channels` ready frames into `output`.
    ///
    /// Returns the number of frames written; 0 when nothing is ready, before
    /// configuration, and after the session has drained.
    pub fn receive_samples(&mut self, output: &mut [f32]) -> usize {
        if matches!(
            self.state,
            SessionState::Unconfigured | SessionState::Drained
        ) {
            return 0;
        }
        let frames = self.output.receive(output);
        self.frames_received += frames as u64;
        if self.state == SessionState::Draining && self.output.is_empty() {
            self.state = SessionState::Drained;
            tracing::debug!(frames_out = self.frames_received, "session drained");
        }
        frames
    }

    /// Signal end of input and release every buffered frame.
    ///
    /// A second call has no effect.
    pub fn flush(&mut self) -> Result<()> {
        let result = self.try_flush();
        self.errors.track(result)
    }

    fn try_flush(&mut self) -> Result<()> {
        match self.state {
            SessionState::Unconfigured => {
                Err(Error::InvalidState("flush called before configure".into()))
            }
            SessionState::Draining | SessionState::Drained => Ok(()),
            SessionState::Configured | SessionState::Accepting => {
                self.drain_pipeline();
                self.state = if self.output.is_empty() {
                    SessionState::Drained
                } else {
                    SessionState::Draining
                };
                Ok(())
            }
        }
    }

    /// Drop all buffered audio and return to [`SessionState::Configured`]
    /// with the same configuration.
    pub fn clear(&mut self) {
        if self.state == SessionState::Unconfigured {
            return;
        }
        for stage in &mut self.stages {
            stage.clear();
        }
        self.output.clear();
        self.reset_counters();
        self.errors.clear();
        self.state = SessionState::Configured;
    }

    /// Frames ready for [`receive_samples`](Self::receive_samples).
    pub fn frames_available(&self) -> usize {
        self.output.frames()
    }

    /// Frames accepted so far.
    pub fn input_frames(&self) -> u64 {
        self.frames_in
    }

    /// Frames handed out so far.
    pub fn output_frames(&self) -> u64 {
        self.frames_received
    }

    /// Input frames the pipeline holds back before output appears.
    pub fn latency_frames(&self) -> usize {
        let mut scale = 1.0;
        let mut total = 0.0;
        for stage in &self.stages {
            total += stage.latency_frames() as f64 / scale;
            scale *= stage.frame_ratio();
        }
        total.ceil() as usize
    }

    /// Output frames per input frame across the whole pipeline.
    fn reset_counters(&mut self) {
        self.frames_in = 0;
        self.frames_produced = 0;
        self.frames_received = 0;
    }

    /// Run every stage once, moving output down the chain.
    fn run_pipeline(&mut self) {
        for i in 0..self.stages.len() {
            self.stages[i].process();
            let (head, tail) = self.stages.split_at_mut(i + 1);
            let out = head[i].output_mut();
            match tail.first_mut() {
                Some(next) => {
                    next.input_mut().move_from(out);
                }
                None => {
                    self.frames_produced += self.output.move_from(out) as u64;
                }
            }
        }
    }

    /// Push silence until the expected output length is reached, then trim
    /// the output queue to exactly that length.
    fn drain_pipeline(&mut self) {
        if self.stages.is_empty() {
            return;
        }
        let speed = self.config.map_or(1.0, |c| c.speed_ratio());
        let ratio = 1.0 / speed;
        let target = (self.frames_in as f64 * ratio).round() as u64;

        let missing = target.saturating_sub(self.frames_produced) as f64;
        let budget_frames = self.latency_frames() as f64 + missing / ratio;
        let max_blocks = (budget_frames / FLUSH_BLOCK_FRAMES as f64).ceil() as usize * 2 + 16;

        let silence = vec![0.0f32; FLUSH_BLOCK_FRAMES * self.channels];
        let mut blocks = 0;
        while self.frames_produced < target && blocks < max_blocks {
            if let Some(first) = self.stages.first_mut() {
                first.input_mut().put_samples(&silence);
            }
            self.run_pipeline();
            blocks += 1;
        }
        if self.frames_produced < target {
            tracing::warn!(
                produced = self.frames_produced,
                target,
                "flush stopped short of the expected output length"
            );
        }

        let keep = target.saturating_sub(self.frames_received) as usize;
        let trimmed = self.output.truncate_frames(keep);
        self.frames_produced -= trimmed as u64;

        for stage in &mut self.stages {
            stage.clear();
        }
        tracing::debug!(
            frames_in = self.frames_in,
            target,
            silence_blocks = blocks,
            trimmed,
            "pipeline flushed"
        );
    }
}

/// Build the stage chain for a configuration.
///
/// Identity stages are left out entirely. When the transposer lengthens the
/// signal it runs before the stretcher, otherwise after.
fn build_pipeline(config: &SessionConfig, settings: &StretchSettings) -> Vec<Box<dyn Stage>> {
    if config.is_identity() {
        return Vec::new();
    }
    let channels = config.channels as usize;
    let tempo = config.virtual_tempo();
    let rate = config.virtual_rate();

    let stretcher = ((tempo - 1.0).abs() > IDENTITY_EPSILON)
        .then(|| TimeStretcher::new(channels, config.sample_rate, tempo, settings));
    let transposer = ((rate - 1.0).abs() > IDENTITY_EPSILON).then(|| {
        let taps = settings.anti_alias.then_some(settings.anti_alias_taps);
        RateTransposer::new(channels, rate, taps)
    });

    let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(2);
    if rate <= 1.0 {
        if let Some(t) = transposer {
            stages.push(Box::new(t));
        }
        if let Some(s) = stretcher {
            stages.push(Box::new(s));
        }
    } else {
        if let Some(s) = stretcher {
            stages.push(Box::new(s));
        }
        if let Some(t) = transposer {
            stages.push(Box::new(t));
        }
    }
    stages
}
