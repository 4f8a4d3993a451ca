//! Streaming tempo and pitch processing.
//!
//! [`Processor`] is the entry point: configure it with a
//! [`SessionConfig`](retempo_core::SessionConfig), push interleaved samples,
//! pull processed samples, flush at end of input.
//!
//! Internally the session is a chain of [`Stage`]s:
//!
//! - [`TimeStretcher`]: overlap-add (WSOLA) tempo change without pitch change
//! - [`RateTransposer`]: interpolating resampler, changes pitch and tempo
//!   together, wrapped by an [`AntiAliasFilter`]
//!
//! A pitch shift is a rate change plus the inverse tempo change. Identity
//! settings produce an empty chain and samples pass through untouched.

mod fifo;
pub use fifo::FifoSampleBuffer;

mod filter;
pub use filter::AntiAliasFilter;

mod settings;
pub use settings::{StretchLengths, StretchSettings};

mod stage;
pub use stage::Stage;

mod stretcher;
pub use stretcher::TimeStretcher;

mod transposer;
pub use transposer::RateTransposer;

mod processor;
pub use processor::{Processor, SessionState};
