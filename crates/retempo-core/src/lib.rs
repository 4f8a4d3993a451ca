//! Core types shared by the retempo crates.
//!
//! - [`Error`] / [`ErrorKind`]: the failure taxonomy
//! - [`params`]: tempo, pitch and rate validation
//! - [`SessionConfig`]: configuration of one processing run
//! - [`SampleFormat`] / [`PcmFormat`]: PCM byte layouts and sample codecs
//! - [`PcmSink`]: where produced bytes go
//! - [`ErrorSlot`] / [`version_string`]: status reporting

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod params;
pub use params::{
    parse_percent_change, pitch_ratio, ratio_from_percent_change, validate, validate_rate,
    MAX_PITCH_SEMITONES, MAX_RATIO, MIN_PITCH_SEMITONES, MIN_RATIO,
};

mod config;
pub use config::{SessionConfig, MAX_VIRTUAL_RATIO};

mod format;
pub use format::{ChannelLayout, PcmFormat, SampleFormat};

mod sink;
pub use sink::{PcmSink, WriterSink};

mod status;
pub use status::{version_string, ErrorSlot};
