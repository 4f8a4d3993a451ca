//! DSP utilities applied on the way to disk.

pub mod resample;

pub use resample::{ResampleQuality, StreamResampler};
