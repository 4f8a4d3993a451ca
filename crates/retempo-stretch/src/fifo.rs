//! Interleaved sample FIFO.
//!
//! Frames are appended at the back and consumed from the front. Consumed
//! space is reclaimed lazily, so memory stays proportional to the number of
//! pending frames rather than to the length of the stream.

/// Reclaim consumed space once at least this many samples are dead.
const COMPACT_THRESHOLD: usize = 4096;

/// Interleaved multi-channel sample queue.
#[derive(Debug, Clone)]
pub struct FifoSampleBuffer {
    buffer: Vec<f32>,
    read: usize,
    channels: usize,
}

impl FifoSampleBuffer {
    pub fn new(channels: usize) -> Self {
        Self {
            buffer: Vec::new(),
            read: 0,
            channels: channels.max(1),
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of whole frames queued.
    #[inline]
    pub fn frames(&self) -> usize {
        (self.buffer.len() - self.read) / self.channels
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Queued samples, oldest first.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.buffer[self.read..]
    }

    /// Append interleaved samples. `samples.len()` must be a multiple of the
    /// channel count.
    pub fn put_samples(&mut self, samples: &[f32]) {
        debug_assert_eq!(samples.len() % self.channels, 0);
        self.compact();
        self.buffer.extend_from_slice(samples);
    }

    /// Append `frames` frames of silence.
    pub fn put_silence(&mut self, frames: usize) {
        self.compact();
        let new_len = self.buffer.len() + frames * self.channels;
        self.buffer.resize(new_len, 0.0);
    }

    /// Append `frames` zeroed frames and return them for in-place writing.
    pub fn append_zeroed(&mut self, frames: usize) -> &mut [f32] {
        self.compact();
        let start = self.buffer.len();
        self.buffer.resize(start + frames * self.channels, 0.0);
        &mut self.buffer[start..]
    }

    /// Move up to `output.len() / channels` frames into `output`.
    ///
    /// Returns the number of frames written.
    pub fn receive(&mut self, output: &mut [f32]) -> usize {
        let frames = (output.len() / self.channels).min(self.frames());
        let count = frames * self.channels;
        output[..count].copy_from_slice(&self.buffer[self.read..self.read + count]);
        self.read += count;
        frames
    }

    /// Drop up to `frames` frames from the front. Returns frames dropped.
    pub fn discard(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.frames());
        self.read += frames * self.channels;
        frames
    }

    /// Keep only the first `frames` frames. Returns frames removed.
    pub fn truncate_frames(&mut self, frames: usize) -> usize {
        let current = self.frames();
        if frames >= current {
            return 0;
        }
        self.buffer.truncate(self.read + frames * self.channels);
        current - frames
    }

    /// Move every queued frame of `other` to the back of `self`.
    ///
    /// Returns the number of frames moved.
    pub fn move_from(&mut self, other: &mut FifoSampleBuffer) -> usize {
        debug_assert_eq!(self.channels, other.channels);
        let frames = other.frames();
        if frames > 0 {
            self.put_samples(other.samples());
            other.clear();
        }
        frames
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read = 0;
    }

    /// Samples currently allocated, including consumed-but-unreclaimed space.
    #[cfg(test)]
    fn allocated_samples(&self) -> usize {
        self.buffer.len()
    }

    fn compact(&mut self) {
        if self.read == 0 {
            return;
        }
        if self.read == self.buffer.len() {
            self.buffer.clear();
            self.read = 0;
        } else if self.read >= COMPACT_THRESHOLD && self.read * 2 >= self.buffer.len() {
            self.buffer.drain(..self.read);
            self.read = 0;
        }
    }
}
