//! Sample-rate transposer: linear interpolation plus anti-alias filtering.
//!
//! Playing `rate` input frames per output frame shifts pitch and tempo
//! together by `rate`. Combined with the time stretcher this yields pitch
//! change at constant tempo.

use crate::fifo::FifoSampleBuffer;
use crate::filter::AntiAliasFilter;
use crate::stage::Stage;

pub struct RateTransposer {
    rate: f64,
    channels: usize,
    /// Read position within the input queue, in frames. The integer part is
    /// applied at the start of each call.
    fract: f64,
    filter: Option<AntiAliasFilter>,
    input: FifoSampleBuffer,
    /// Between transposition and filtering.
    mid: FifoSampleBuffer,
    output: FifoSampleBuffer,
    scratch: Vec<f32>,
}

impl RateTransposer {
    /// `rate` > 1 shortens the signal and raises pitch.
    pub fn new(channels: usize, rate: f64, anti_alias_taps: Option<usize>) -> Self {
        let filter = anti_alias_taps.map(|taps| {
            let cutoff = if rate > 1.0 { 0.5 / rate } else { 0.5 * rate };
            AntiAliasFilter::new(cutoff, taps, channels)
        });

        tracing::debug!(
            rate,
            anti_alias = filter.as_ref().map(|f| f.taps()).unwrap_or(0),
            "rate transposer configured"
        );

        let mut transposer = Self {
            rate,
            channels,
            fract: 0.0,
            filter,
            input: FifoSampleBuffer::new(channels),
            mid: FifoSampleBuffer::new(channels),
            output: FifoSampleBuffer::new(channels),
            scratch: Vec::new(),
        };
        transposer.prime();
        transposer
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Pre-fill the filter input so its group delay does not shift output.
    fn prime(&mut self) {
        if let Some(filter) = &self.filter {
            let delay = filter.delay();
            if self.rate > 1.0 {
                self.input.put_silence(delay);
            } else {
                self.mid.put_silence(delay);
            }
        }
    }

    /// Linear interpolation from `src` into `dst` at `rate` source frames
    /// per output frame.
    fn transpose(
        src: &mut FifoSampleBuffer,
        dst: &mut FifoSampleBuffer,
        rate: f64,
        fract: &mut f64,
        channels: usize,
        scratch: &mut Vec<f32>,
    ) {
        let frames = src.frames();
        let whole = fract.floor();
        let mut pos = whole as usize;
        let mut frac = *fract - whole;

        scratch.clear();
        let samples = src.samples();
        while pos + 1 < frames {
            let a = &samples[pos * channels..(pos + 1) * channels];
            let b = &samples[(pos + 1) * channels..(pos + 2) * channels];
            let f = frac as f32;
            scratch.extend(a.iter().zip(b).map(|(&x, &y)| x + (y - x) * f));

            frac += rate;
            let step = frac.floor();
            frac -= step;
            pos += step as usize;
        }

        let consumed = pos.min(frames);
        src.discard(consumed);
        *fract = frac + (pos - consumed) as f64;
        dst.put_samples(scratch.as_slice());
    }
}

impl Stage for RateTransposer {
    fn name(&self) -> &'static str {
        "rate-transpose"
    }

    fn input_mut(&mut self) -> &mut FifoSampleBuffer {
        &mut self.input
    }

    fn output_mut(&mut self) -> &mut FifoSampleBuffer {
        &mut self.output
    }

    fn process(&mut self) {
        let channels = self.channels;
        match &self.filter {
            None => Self::transpose(
                &mut self.input,
                &mut self.output,
                self.rate,
                &mut self.fract,
                channels,
                &mut self.scratch,
            ),
            Some(filter) if self.rate > 1.0 => {
                // Decimation: band-limit first.
                filter.evaluate(&mut self.input, &mut self.mid);
                Self::transpose(
                    &mut self.mid,
                    &mut self.output,
                    self.rate,
                    &mut self.fract,
                    channels,
                    &mut self.scratch,
                );
            }
            Some(filter) => {
                // Interpolation: remove images afterwards.
                Self::transpose(
                    &mut self.input,
                    &mut self.mid,
                    self.rate,
                    &mut self.fract,
                    channels,
                    &mut self.scratch,
                );
                filter.evaluate(&mut self.mid, &mut self.output);
            }
        }
    }

    fn clear(&mut self) {
        self.input.clear();
        self.mid.clear();
        self.output.clear();
        self.fract = 0.0;
        self.prime();
    }

    fn latency_frames(&self) -> usize {
        let filter = self.filter.as_ref().map(|f| f.taps()).unwrap_or(0);
        filter + 1
    }

    fn frame_ratio(&self) -> f64 {
        1.0 / self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(t: &mut RateTransposer, input: &[f32], block: usize) -> Vec<f32> {
        let mut out = Vec::new();
        for chunk in input.chunks(block) {
            t.input_mut().put_samples(chunk);
            t.process();
            out.extend_from_slice(t.output_mut().samples());
            t.output_mut().clear();
        }
        out
    }

    #[test]
    fn test_ramp_is_resampled_linearly() {
        let ramp: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut t = RateTransposer::new(1, 0.5, None);
        let out = run(&mut t, &ramp, 100);
        // Every input step yields two output frames.
        assert_eq!(out.len(), 198);
        for (i, &s) in out.iter().enumerate() {
            assert_relative_eq!(s, i as f32 * 0.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_fractional_position_carries_across_calls() {
        let ramp: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let mut whole = RateTransposer::new(1, 1.37, None);
        let mut pieces = RateTransposer::new(1, 1.37, None);
        let a = run(&mut whole, &ramp, 1000);
        let b = run(&mut pieces, &ramp, 3);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(x, y, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_rate_above_two_skips_across_calls() {
        let ramp: Vec<f32> = (0..600).map(|i| i as f32).collect();
        let mut t = RateTransposer::new(1, 3.0, None);
        let out = run(&mut t, &ramp, 1);
        assert_eq!(out.len(), 200);
        for (i, &s) in out.iter().enumerate() {
            assert_relative_eq!(s, (i * 3) as f32, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_output_length_scales_with_rate() {
        let input = vec![0.25; 2 * 48_000];
        for rate in [0.5, 0.75, 1.5, 2.0] {
            let mut t = RateTransposer::new(2, rate, Some(64));
            let out = run(&mut t, &input, 1024);
            let frames = out.len() / 2;
            let expected = 48_000.0 / rate;
            assert!(
                (frames as f64 - expected).abs() < 100.0,
                "rate {rate}: {frames} frames, expected {expected}"
            );
        }
    }

    #[test]
    fn test_filtered_dc_level_is_preserved() {
        let input = vec![0.5; 8000];
        let mut t = RateTransposer::new(1, 1.5, Some(64));
        let out = run(&mut t, &input, 512);
        for &s in &out[100..out.len() - 100] {
            assert_relative_eq!(s, 0.5, epsilon = 1e-3);
        }
    }
}
