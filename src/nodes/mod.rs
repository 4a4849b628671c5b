//! Built-in audio nodes.
//!
//! Nodes are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Generate audio with no signal inputs:
//! - [`Sine`] - Sine oscillator with an automatable frequency and an FM input
//! - [`NoisePlayer`] - Loops the shared noise buffer
//!
//! ## Effects ([`effect`])
//!
//! Process audio (inputs → outputs):
//! - [`Gain`] - Automatable gain with a modulation input
//! - [`BandPass`] - Biquad band-pass with an automatable centre frequency
//! - [`Merger`] - Builds a multi-channel signal from mono inputs
//! - [`Mixer`] - Sum multiple inputs together
//!
//! ## Sinks ([`sink`])
//!
//! Consume audio with no audio outputs:
//! - [`CpalSink`] - Output to system audio device (requires `cpal_sink` feature)
//! - [`RtrbSink`] - Write interleaved samples to a ring buffer
//!
//! # Message Types
//!
//! Nodes with parameters have associated message types:
//! - [`SineMessage`] - Automate [`Sine`] frequency
//! - [`GainMessage`] - Automate [`Gain`] level
//! - [`BandPassMessage`] - Automate [`BandPass`] centre, set its Q
//!
//! Nodes without parameters (like [`Mixer`]) use `()` as their message type.

pub mod source;
pub mod effect;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::{NoisePlayer, Sine, SineMessage};
pub use effect::{BandPass, BandPassMessage, Gain, GainMessage, Merger, Mixer};
pub use sink::RtrbSink;

#[cfg(feature = "cpal_sink")]
pub use sink::{CpalSink, CpalTransport};
