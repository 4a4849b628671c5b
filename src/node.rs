//! Core node trait and context types.

use dasp_graph::Buffer;

use crate::graph::Inputs;

/// Information available during audio processing.
///
/// Passed to every [`AudioNode::process`] call. Contains the graph's sample rate,
/// the buffer size (always 64 samples) and the audio clock.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of samples per buffer (currently always 64)
    pub buffer_size: usize,
    /// Audio clock: index of the first sample frame of the current block.
    ///
    /// Advances by `buffer_size` after every rendered block and stands still
    /// while the graph only drains messages.
    pub frame: u64,
}

impl ProcessContext {
    /// Audio clock in seconds at the start of the current block.
    #[inline]
    pub fn time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }
}

/// Unique identifier for a node within a graph.
///
/// You typically don't interact with this directly - use [`Handle`](crate::Handle) instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

/// The core trait for audio processing nodes.
///
/// Nodes can be:
/// - **Sources**: Generate audio (no signal inputs) - oscillators, noise players
/// - **Effects**: Process audio (signal inputs → outputs) - gain, filters, mergers
/// - **Sinks**: Consume audio (no outputs) - device outputs, ring buffers
///
/// # Message-Based Parameters
///
/// Instead of shared mutable state, nodes receive parameter updates via messages.
/// The graph drains a node's queue and hands every message to
/// [`handle_message`](Self::handle_message) before calling
/// [`process`](Self::process) for the block. While a context is suspended the
/// graph still drains messages, so control values stay current without any
/// audio being rendered.
///
/// # Parameter Inputs
///
/// Besides ordinary signal inputs a node may expose audio-rate parameter inputs
/// ([`num_params`](Self::num_params)). Signals connected to parameter `n` are
/// summed and added to that parameter's value sample by sample.
pub trait AudioNode: Send + 'static {
    /// Message type for parameter updates.
    ///
    /// Use a custom enum for nodes with parameters, or `()` for nodes without.
    type Message: Send + 'static;

    /// Apply one parameter message.
    fn handle_message(&mut self, _ctx: &ProcessContext, _msg: Self::Message) {}

    /// Render one block of audio.
    ///
    /// - `ctx` - Sample rate, buffer size and audio clock
    /// - `inputs` - Signal, channel and parameter inputs from connected nodes
    /// - `outputs` - Audio output buffers to fill, one per output channel
    fn process(&mut self, ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]);

    /// Number of audio output channels.
    fn num_outputs(&self) -> usize { 1 }

    /// Number of audio-rate parameter inputs.
    fn num_params(&self) -> usize { 0 }
}
