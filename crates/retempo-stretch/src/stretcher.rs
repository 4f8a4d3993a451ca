//! Overlap-add time stretcher (WSOLA).
//!
//! The input is cut into sequences of `sequence` frames. Each new sequence
//! is placed where it best matches the tail of the previous one: within a
//! window of `seek` frames the position with the highest normalised
//! cross-correlation against the previous tail is chosen, then the two are
//! crossfaded over `overlap` frames. Advancing the input by
//! `tempo * (sequence - overlap)` frames per emitted sequence changes the
//! duration without touching pitch.

use crate::fifo::FifoSampleBuffer;
use crate::settings::{StretchLengths, StretchSettings};
use crate::stage::Stage;

/// Quick seek: coarse scan stride.
const QUICK_SEEK_STEP: usize = 8;

pub struct TimeStretcher {
    channels: usize,
    tempo: f64,
    quick_seek: bool,
    lengths: StretchLengths,

    /// Fractional input advance per sequence.
    nominal_skip: f64,
    skip_fract: f64,
    /// Input frames required before a sequence can be processed.
    sample_req: usize,
    is_beginning: bool,

    /// Tail of the previous sequence, waiting to be crossfaded.
    mid_buffer: Vec<f32>,
    /// `mid_buffer` weighted by a parabola, used as correlation reference.
    ref_mid: Vec<f32>,

    input: FifoSampleBuffer,
    output: FifoSampleBuffer,
}

impl TimeStretcher {
    pub fn new(channels: usize, sample_rate: u32, tempo: f64, settings: &StretchSettings) -> Self {
        let lengths = settings.resolve(sample_rate, tempo);
        let nominal_skip = tempo * (lengths.sequence - lengths.overlap) as f64;
        let int_skip = (nominal_skip + 0.5) as usize;
        let sample_req = int_skip
            .saturating_add(lengths.overlap)
            .max(lengths.sequence)
            .saturating_add(lengths.seek);

        tracing::debug!(
            tempo,
            sequence = lengths.sequence,
            seek = lengths.seek,
            overlap = lengths.overlap,
            sample_req,
            "time stretcher configured"
        );

        Self {
            channels,
            tempo,
            quick_seek: settings.quick_seek,
            lengths,
            nominal_skip,
            skip_fract: 0.0,
            sample_req,
            is_beginning: true,
            mid_buffer: vec![0.0; lengths.overlap * channels],
            ref_mid: vec![0.0; lengths.overlap * channels],
            input: FifoSampleBuffer::new(channels),
            output: FifoSampleBuffer::new(channels),
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn lengths(&self) -> StretchLengths {
        self.lengths
    }

    /// Weight the previous tail by `i * (overlap - i)` so the correlation
    /// favours alignment in the middle of the crossfade.
    fn precalc_reference(&mut self) {
        let overlap = self.lengths.overlap;
        for i in 0..overlap {
            let weight = (i * (overlap - i)) as f32;
            for ch in 0..self.channels {
                let idx = i * self.channels + ch;
                self.ref_mid[idx] = self.mid_buffer[idx] * weight;
            }
        }
    }

    /// Normalised cross-correlation of `candidate` against the reference.
    fn cross_corr(&self, candidate: &[f32]) -> f64 {
        let len = self.lengths.overlap * self.channels;
        let mut corr = 0.0f64;
        let mut norm = 0.0f64;
        for (&c, &r) in candidate[..len].iter().zip(&self.ref_mid[..len]) {
            corr += c as f64 * r as f64;
            norm += c as f64 * c as f64;
        }
        if norm < 1e-9 {
            norm = 1.0;
        }
        corr / norm.sqrt()
    }

    /// Score of the candidate at `offset`, with a mild bias toward the
    /// centre of the seek window.
    fn score(&self, samples: &[f32], offset: usize) -> f64 {
        let seek = self.lengths.seek as f64;
        let corr = self.cross_corr(&samples[offset * self.channels..]);
        let tmp = (2.0 * offset as f64 - seek) / seek;
        (corr + 0.1) * (1.0 - 0.25 * tmp * tmp)
    }

    fn seek_best_overlap(&mut self) -> usize {
        self.precalc_reference();
        let seek = self.lengths.seek;
        if self.quick_seek {
            let coarse = self.best_offset((0..seek).step_by(QUICK_SEEK_STEP));
            let lo = coarse.saturating_sub(QUICK_SEEK_STEP - 1);
            let hi = (coarse + QUICK_SEEK_STEP).min(seek);
            self.best_offset(lo..hi)
        } else {
            self.best_offset(0..seek)
        }
    }

    fn best_offset(&self, offsets: impl Iterator<Item = usize>) -> usize {
        let samples = self.input.samples();
        let mut best_offset = 0;
        let mut best_score = f64::MIN;
        for offset in offsets {
            let score = self.score(samples, offset);
            if score > best_score {
                best_score = score;
                best_offset = offset;
            }
        }
        best_offset
    }

    /// Crossfade the stored tail with the input at `offset` into `out`.
    fn overlap_into(out: &mut [f32], input: &[f32], mid: &[f32], overlap: usize, channels: usize) {
        let scale = 1.0 / overlap as f32;
        for i in 0..overlap {
            let fade_in = i as f32 * scale;
            let fade_out = (overlap - i) as f32 * scale;
            for ch in 0..channels {
                let idx = i * channels + ch;
                out[idx] = input[idx] * fade_in + mid[idx] * fade_out;
            }
        }
    }

    fn process_sequences(&mut self) {
        let StretchLengths {
            sequence, overlap, ..
        } = self.lengths;
        let channels = self.channels;

        while self.input.frames() >= self.sample_req {
            let mut offset = 0;
            if !self.is_beginning {
                offset = self.seek_best_overlap();
                let input = &self.input.samples()[offset * channels..];
                let out = self.output.append_zeroed(overlap);
                Self::overlap_into(out, input, &self.mid_buffer, overlap, channels);
                offset += overlap;
            } else {
                // The first sequence has nothing to crossfade with. Skip ahead
                // so that output stays aligned with input on average.
                self.is_beginning = false;
                let skip = (self.tempo * overlap as f64 + 0.5 * self.lengths.seek as f64 + 0.5)
                    as usize;
                self.skip_fract -= skip as f64;
                if self.skip_fract <= -self.nominal_skip {
                    self.skip_fract = -self.nominal_skip;
                }
            }

            if self.input.frames() < offset + sequence - overlap {
                break;
            }

            let body = sequence - 2 * overlap;
            let samples = self.input.samples();
            let body_start = offset * channels;
            let body_end = (offset + body) * channels;
            self.output.put_samples(&samples[body_start..body_end]);
            self.mid_buffer
                .copy_from_slice(&samples[body_end..body_end + overlap * channels]);

            self.skip_fract += self.nominal_skip;
            let skip = self.skip_fract.max(0.0) as usize;
            self.skip_fract -= skip as f64;
            self.input.discard(skip);
        }
    }
}

impl Stage for TimeStretcher {
    fn name(&self) -> &'static str {
        "time-stretch"
    }

    fn input_mut(&mut self) -> &mut FifoSampleBuffer {
        &mut self.input
    }

    fn output_mut(&mut self) -> &mut FifoSampleBuffer {
        &mut self.output
    }

    fn process(&mut self) {
        self.process_sequences();
    }

    fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
        self.mid_buffer.fill(0.0);
        self.ref_mid.fill(0.0);
        self.skip_fract = 0.0;
        self.is_beginning = true;
    }

    fn latency_frames(&self) -> usize {
        self.sample_req
    }

    fn frame_ratio(&self) -> f64 {
        1.0 / self.tempo
    }
}
