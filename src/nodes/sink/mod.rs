//! Audio sinks - consume audio, produce no outputs

#[cfg(feature = "cpal_sink")]
mod cpal_sink;
mod rtrb_sink;

#[cfg(feature = "cpal_sink")]
pub use cpal_sink::{CpalSink, CpalTransport};
pub use rtrb_sink::RtrbSink;
