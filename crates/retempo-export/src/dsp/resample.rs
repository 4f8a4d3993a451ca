//! Streaming sample-rate conversion using rubato
//!
//! Interleaved input of any length is accepted incrementally; rubato works
//! on fixed-size chunks, so partial chunks are held until more input
//! arrives or [`StreamResampler::finish`] pads them out.

use crate::error::{ExportError, Result};
use rubato::{FftFixedIn, Resampler};

/// Resampling quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleQuality {
    /// Fast resampling (lower quality)
    Fast,
    /// Balanced quality/speed (default)
    #[default]
    Medium,
    /// High quality
    High,
    /// Best quality (slowest)
    Best,
}

impl ResampleQuality {
    fn chunk_size(&self) -> usize {
        match self {
            ResampleQuality::Fast => 512,
            ResampleQuality::Medium => 1024,
            ResampleQuality::High => 2048,
            ResampleQuality::Best => 4096,
        }
    }

    fn sub_chunks(&self) -> usize {
        match self {
            ResampleQuality::Fast => 1,
            ResampleQuality::Medium => 2,
            ResampleQuality::High => 4,
            ResampleQuality::Best => 8,
        }
    }
}

/// Incremental resampler over interleaved `f32` frames.
///
/// Total output length is `round(input_frames * target / source)`, with the
/// resampler's own delay removed from the front.
pub struct StreamResampler {
    resampler: Option<FftFixedIn<f32>>,
    channels: usize,
    source_rate: u32,
    target_rate: u32,
    /// Per-channel input waiting for a full chunk.
    pending: Vec<Vec<f32>>,
    /// Leading output frames still to drop.
    delay_remaining: usize,
    frames_in: u64,
    frames_out: u64,
}

impl StreamResampler {
    pub fn new(
        channels: usize,
        source_rate: u32,
        target_rate: u32,
        quality: ResampleQuality,
    ) -> Result<Self> {
        if channels == 0 || source_rate == 0 || target_rate == 0 {
            return Err(ExportError::InvalidOptions(format!(
                "cannot resample {channels} channels from {source_rate} Hz to {target_rate} Hz"
            )));
        }

        let resampler = if source_rate == target_rate {
            None
        } else {
            Some(FftFixedIn::<f32>::new(
                source_rate as usize,
                target_rate as usize,
                quality.chunk_size(),
                quality.sub_chunks(),
                channels,
            )?)
        };
        let delay_remaining = resampler.as_ref().map(|r| r.output_delay()).unwrap_or(0);

        Ok(Self {
            resampler,
            channels,
            source_rate,
            target_rate,
            pending: vec![Vec::new(); channels],
            delay_remaining,
            frames_in: 0,
            frames_out: 0,
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /// Output length implied by the input seen so far.
    fn expected_output_frames(&self) -> u64 {
        (self.frames_in as f64 * self.target_rate as f64 / self.source_rate as f64).round() as u64
    }

    /// Resample `input`, appending interleaved output to `out`.
    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) -> Result<()> {
        let frames = input.len() / self.channels;
        self.frames_in += frames as u64;

        if self.resampler.is_none() {
            out.extend_from_slice(&input[..frames * self.channels]);
            self.frames_out += frames as u64;
            return Ok(());
        }

        for frame in input.chunks_exact(self.channels) {
            for (ch, &s) in frame.iter().enumerate() {
                self.pending[ch].push(s);
            }
        }
        self.run_chunks(out, None)
    }

    /// Pad the final partial chunk and emit the remaining output.
    pub fn finish(&mut self, out: &mut Vec<f32>) -> Result<()> {
        if self.resampler.is_none() {
            return Ok(());
        }
        let target = self.expected_output_frames();
        // One padded chunk per pass.
        let mut passes = 0;
        while self.frames_out < target && passes < 64 {
            let needed = self
                .resampler
                .as_ref()
                .map(|r| r.input_frames_next())
                .unwrap_or(0);
            for ch in &mut self.pending {
                if ch.len() < needed {
                    ch.resize(needed, 0.0);
                }
            }
            self.run_chunks(out, Some(target))?;
            passes += 1;
        }
        for ch in &mut self.pending {
            ch.clear();
        }
        Ok(())
    }

    fn run_chunks(&mut self, out: &mut Vec<f32>, limit: Option<u64>) -> Result<()> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };
        loop {
            let needed = resampler.input_frames_next();
            if self.pending[0].len() < needed {
                return Ok(());
            }
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|ch| ch.drain(..needed).collect())
                .collect();
            let output = resampler.process(&chunk, None)?;

            let produced = output.first().map(|c| c.len()).unwrap_or(0);
            let skip = self.delay_remaining.min(produced);
            self.delay_remaining -= skip;

            let mut end = produced;
            if let Some(limit) = limit {
                let room = limit.saturating_sub(self.frames_out) as usize;
                end = end.min(skip + room);
            }
            for i in skip..end {
                for ch in &output {
                    out.push(ch[i]);
                }
            }
            self.frames_out += (end - skip) as u64;

            if limit.is_some_and(|l| self.frames_out >= l) {
                return Ok(());
            }
        }
    }
}
