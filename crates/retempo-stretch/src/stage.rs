//! Pipeline stage abstraction.

use crate::fifo::FifoSampleBuffer;

/// One step of the processing pipeline.
///
/// A stage consumes frames from its input queue and appends results to its
/// output queue. `process` may leave input behind when it needs more context.
pub trait Stage: Send {
    fn name(&self) -> &'static str;

    fn input_mut(&mut self) -> &mut FifoSampleBuffer;

    fn output_mut(&mut self) -> &mut FifoSampleBuffer;

    /// Consume as much buffered input as possible.
    fn process(&mut self);

    /// Drop all buffered audio and return to the initial state.
    fn clear(&mut self);

    /// Input frames held back before output starts.
    fn latency_frames(&self) -> usize;

    /// Output frames produced per input frame, on average.
    fn frame_ratio(&self) -> f64;
}
