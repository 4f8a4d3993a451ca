//! # retempo-export
//!
//! Container and output utilities for retempo:
//! - **WAV writing**: placeholder header, streamed payload, size fields
//!   patched on [`finalize`](WavStreamWriter::finalize)
//! - **Raw PCM conversion**: [`pcm_to_wav`] wraps a headerless file
//! - **WAV input** (`wav` feature): [`open_wav`] locates the data chunk of
//!   any PCM WAV file via hound
//! - **Resampling**: [`StreamResampler`] converts the output sample rate
//!   incrementally via rubato
//!
//! ## Feature Flags
//!
//! - `wav` (default): header-aware WAV input via hound

pub mod error;

mod convert;
pub mod dsp;
pub mod format;

pub use convert::{convert_stream, pcm_to_wav};
pub use dsp::{ResampleQuality, StreamResampler};
pub use error::{ExportError, Result};
pub use format::{WavHeader, WavStreamWriter, MAX_DATA_LEN, WAV_HEADER_LEN};

#[cfg(feature = "wav")]
pub use format::{open_wav, WavInput};
