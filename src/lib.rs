//! # retempo - streaming tempo and pitch processing
//!
//! Change the tempo of PCM audio without changing its pitch, change pitch
//! without changing tempo, or both, over inputs of any length in bounded
//! memory.
//!
//! ## Architecture
//!
//! retempo is an umbrella crate that coordinates:
//! - **retempo-core** - error taxonomy, parameter validation, PCM formats, sinks
//! - **retempo-stretch** - the push/pull [`Processor`] (overlap-add stretcher,
//!   rate transposer)
//! - **retempo-export** - WAV container writer, WAV input, output resampling
//!
//! On top of those it provides the [`StreamDriver`] (bytes in, bytes out),
//! [`ProcessBuilder`] (WAV file in, WAV file out) and [`JobHandle`] for
//! running a file job on a worker thread.
//!
//! ## Quick Start
//!
//! ```no_run
//! use retempo::prelude::*;
//!
//! // Raw 16-bit PCM with a 44-byte header to skip, into any sink.
//! let config = SessionConfig::new(16000, 1).tempo(1.2);
//! let options = DriverOptions::default().header_bytes(44);
//! let mut driver = StreamDriver::new(config, options)?;
//!
//! let input = std::fs::File::open("in.wav")?;
//! let mut sink = WriterSink::new(std::fs::File::create("out.pcm")?);
//! let report = driver.process_stream(input, &mut sink)?;
//!
//! // Wrap the raw output in a playable WAV file.
//! pcm_to_wav("out.pcm", "out.wav", 16000, ChannelLayout::Mono, 16)?;
//! println!("done in {:?}", report.elapsed);
//! # Ok::<(), retempo::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - library plus the `retempo` command-line tool
//! - `cli` - the `retempo` binary (clap, tracing-subscriber)

/// Re-export of retempo-core for direct access
pub use retempo_core as core;
/// Re-export of retempo-export for direct access
pub use retempo_export as export;
/// Re-export of retempo-stretch for direct access
pub use retempo_stretch as stretch;

pub use retempo_core::{
    parse_percent_change, validate, version_string, ChannelLayout, ErrorKind, PcmFormat,
    PcmSink, SampleFormat, SessionConfig, WriterSink,
};
pub use retempo_export::{open_wav, pcm_to_wav, ResampleQuality, WavStreamWriter};
pub use retempo_stretch::{Processor, SessionState, StretchSettings};

mod cancel;
mod driver;
mod error;
mod file;
mod job;

pub use cancel::CancelToken;
pub use driver::{DriverOptions, StreamDriver, StreamProgress, StreamReport};
pub use error::{Error, Result};
pub use file::ProcessBuilder;
pub use job::{JobHandle, JobStatus};

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        pcm_to_wav, CancelToken, ChannelLayout, DriverOptions, Error, JobHandle, JobStatus,
        PcmSink, ProcessBuilder, Processor, Result, SessionConfig, StreamDriver, StreamReport,
        WriterSink,
    };
}
