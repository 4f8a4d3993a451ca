//! Windowed-sinc low-pass FIR used around the rate transposer.

use crate::fifo::FifoSampleBuffer;
use std::f64::consts::PI;

pub struct AntiAliasFilter {
    coeffs: Vec<f32>,
    channels: usize,
}

impl AntiAliasFilter {
    /// Build a Hamming-windowed sinc low-pass.
    ///
    /// `cutoff` is normalised to the sample rate (0.5 = Nyquist). `taps` must
    /// be even. Coefficients are scaled to unity DC gain.
    pub fn new(cutoff: f64, taps: usize, channels: usize) -> Self {
        debug_assert!(taps >= 2 && taps % 2 == 0);
        let cutoff = cutoff.clamp(1e-4, 0.5);
        let centre = (taps / 2) as f64;
        let wc = 2.0 * PI * cutoff;

        let mut coeffs: Vec<f64> = (0..taps)
            .map(|i| {
                let t = i as f64 - centre;
                let sinc = if t == 0.0 { 1.0 } else { (wc * t).sin() / (wc * t) };
                let window = 0.54 + 0.46 * (2.0 * PI * t / taps as f64).cos();
                sinc * window
            })
            .collect();
        let sum: f64 = coeffs.iter().sum();
        for c in &mut coeffs {
            *c /= sum;
        }

        Self {
            coeffs: coeffs.into_iter().map(|c| c as f32).collect(),
            channels,
        }
    }

    pub fn taps(&self) -> usize {
        self.coeffs.len()
    }

    /// Delay in frames between input and output.
    pub fn delay(&self) -> usize {
        self.coeffs.len() / 2
    }

    /// Filter every complete window in `src` into `dst`.
    ///
    /// Leaves `taps - 1` frames of history in `src`. Returns frames produced.
    pub fn evaluate(&self, src: &mut FifoSampleBuffer, dst: &mut FifoSampleBuffer) -> usize {
        let taps = self.coeffs.len();
        let available = src.frames();
        if available < taps {
            return 0;
        }
        let frames = available - taps + 1;
        let channels = self.channels;
        let input = src.samples();
        let out = dst.append_zeroed(frames);

        for n in 0..frames {
            let window = &input[n * channels..(n + taps) * channels];
            for ch in 0..channels {
                let mut acc = 0.0f32;
                for (k, &c) in self.coeffs.iter().enumerate() {
                    acc += c * window[k * channels + ch];
                }
                out[n * channels + ch] = acc;
            }
        }

        src.discard(frames);
        frames
    }
}
