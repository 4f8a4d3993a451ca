//! WAV container support.

pub mod header;
pub mod writer;

#[cfg(feature = "wav")]
pub mod reader;

pub use header::{WavHeader, MAX_DATA_LEN, WAV_HEADER_LEN};
pub use writer::WavStreamWriter;

#[cfg(feature = "wav")]
pub use reader::{open_wav, WavInput};
