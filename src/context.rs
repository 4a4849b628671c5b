//! Context - owns the audio graph, the master bus and the output
//!
//! Everything that makes sound in a session lives in one [`Context`]: the
//! graph with every generator node, a stereo master bus the generators mix
//! into, the output sink and (for device outputs) the transport that starts
//! and stops the device stream.

use crate::config::EngineConfig;
use crate::graph::{AudioGraph, Port};
use crate::node::{AudioNode, NodeId};
use crate::nodes::Mixer;

#[cfg(feature = "cpal_sink")]
use crate::device::CpalDevice;
#[cfg(feature = "cpal_sink")]
use crate::error::EngineError;

/// Handle for sending messages to a node
pub struct Handle<M: Send + 'static> {
    pub(crate) node_id: NodeId,
    pub(crate) sender: rtrb::Producer<M>,
}

impl<M: Send + 'static> Handle<M> {
    /// Send a message to the node
    ///
    /// Returns the message back if the node's queue is full.
    pub fn send(&mut self, msg: M) -> Result<(), M> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    pub fn id(&self) -> NodeId {
        self.node_id
    }
}

/// Result of asking an output stream to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Playing,
    /// The platform refused to start the stream (e.g. an autoplay policy).
    /// Retry after a user gesture.
    Blocked,
}

/// Starts and stops the stream that consumes a context's output.
pub trait StreamTransport: Send {
    fn play(&mut self) -> StreamState;
    fn pause(&mut self);
    /// Release the stream. Called exactly once, when the context is closed.
    fn close(&mut self);
}

/// Whether the context is rendering audio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// No audio is rendered; queued control messages are still applied.
    Suspended,
}

/// The shared audio-processing context of a session
pub struct Context {
    graph: AudioGraph,
    sample_rate: u32,
    queue_size: usize,
    /// Stereo bus every generator output feeds
    master: NodeId,
    /// The output sink node (e.g., CpalSink)
    sink_node: Option<NodeId>,
    transport: Option<Box<dyn StreamTransport>>,
    state: ContextState,
}

impl Context {
    /// Create a suspended context with explicit sample rate and no output
    ///
    /// Use `with_output()` to set the output sink. Without one, blocks are
    /// rendered into the master bus and discarded.
    pub fn new(sample_rate: u32) -> Self {
        let mut graph = AudioGraph::new(sample_rate);
        let master = graph.add_with_queue_size(Mixer::stereo(), 1).id();
        graph.set_terminal(master);
        Self {
            graph,
            sample_rate,
            queue_size: 64,
            master,
            sink_node: None,
            transport: None,
            state: ContextState::Suspended,
        }
    }

    /// Create a context on the default audio output device
    ///
    /// Honors `config.sample_rate` when the device supports it. Fails with
    /// `EngineUnavailable` when there is no device or its stream cannot be
    /// built.
    #[cfg(feature = "cpal_sink")]
    pub fn default_output(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut device = CpalDevice::default_output()?;
        if let Some(rate) = config.sample_rate {
            device = device.with_sample_rate(rate);
        }
        let (sink, transport) = device.create_sink()?;
        tracing::info!(
            device = device.name(),
            sample_rate = device.sample_rate(),
            channels = device.channels(),
            "opened output device"
        );

        Ok(Self::new(device.sample_rate())
            .with_config(config)
            .with_output(sink)
            .with_transport(transport))
    }

    /// Add a custom output sink fed by the master bus
    pub fn with_output<S: AudioNode<Message = ()>>(mut self, sink: S) -> Self {
        let sink = self.graph.add_with_queue_size(sink, 1).id();
        self.graph.connect(self.master, sink, Port::Signal);
        self.graph.set_terminal(sink);
        self.sink_node = Some(sink);
        self
    }

    pub fn with_transport<T: StreamTransport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Message queue capacity for nodes added from now on
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_queue_size(config.queue_size)
    }

    /// Get the output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn has_output(&self) -> bool {
        self.sink_node.is_some()
    }

    /// Number of nodes in the graph, including the master bus and sink
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Audio clock: frames rendered since the context was created
    pub fn current_frame(&self) -> u64 {
        self.graph.frame()
    }

    /// Audio clock in seconds
    pub fn current_time(&self) -> f64 {
        self.graph.frame() as f64 / self.sample_rate as f64
    }

    /// Add a node to the graph
    pub fn add<N: AudioNode>(&mut self, node: N) -> Handle<N::Message> {
        let handle = self.graph.add_with_queue_size(node, self.queue_size);
        Handle {
            node_id: handle.id(),
            sender: handle.sender,
        }
    }

    /// Connect two nodes
    pub fn connect<M1, M2>(&mut self, from: &Handle<M1>, to: &Handle<M2>)
    where
        M1: Send + 'static,
        M2: Send + 'static,
    {
        self.graph.connect(from.node_id, to.node_id, Port::Signal);
    }

    /// Connect `from` to parameter input `param` of `to`
    pub fn connect_param<M1, M2>(&mut self, from: &Handle<M1>, to: &Handle<M2>, param: usize)
    where
        M1: Send + 'static,
        M2: Send + 'static,
    {
        self.graph.connect(from.node_id, to.node_id, Port::Param(param));
    }

    /// Route `from` into output channel `channel` of a merger
    pub fn connect_channel<M1, M2>(&mut self, from: &Handle<M1>, to: &Handle<M2>, channel: usize)
    where
        M1: Send + 'static,
        M2: Send + 'static,
    {
        self.graph.connect(from.node_id, to.node_id, Port::Channel(channel));
    }

    /// Connect a node to the master bus
    pub fn output<M: Send + 'static>(&mut self, handle: &Handle<M>) {
        self.graph.connect(handle.node_id, self.master, Port::Signal);
    }

    /// Process one block of audio
    ///
    /// While suspended this only applies queued control messages.
    pub fn process(&mut self) {
        match self.state {
            ContextState::Running => self.graph.process(),
            ContextState::Suspended => self.graph.drain_messages(),
        }
    }

    /// Start (or restart) the output.
    ///
    /// A context without a transport always plays.
    pub fn resume(&mut self) -> StreamState {
        let stream = match self.transport.as_mut() {
            Some(transport) => transport.play(),
            None => StreamState::Playing,
        };
        if stream == StreamState::Playing {
            self.state = ContextState::Running;
        }
        stream
    }

    pub fn suspend(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.pause();
        }
        self.state = ContextState::Suspended;
    }

    /// Release the transport, the graph and every node in it.
    pub fn close(mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        tracing::debug!(nodes = self.graph.node_count(), "context closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Gain, GainMessage, RtrbSink, Sine};
    use crate::param::Automation;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTransport {
        plays: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        blocked: bool,
    }

    impl StreamTransport for CountingTransport {
        fn play(&mut self) -> StreamState {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.blocked {
                StreamState::Blocked
            } else {
                StreamState::Playing
            }
        }

        fn pause(&mut self) {}

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn renders_only_while_running() {
        let (producer, mut consumer) = rtrb::RingBuffer::new(1024);
        let mut ctx = Context::new(48_000).with_output(RtrbSink::stereo(producer));
        let sine = ctx.add(Sine::new(440.0));
        ctx.output(&sine);

        ctx.process();
        assert_eq!(ctx.current_frame(), 0);
        assert!(consumer.pop().is_err());

        assert_eq!(ctx.resume(), StreamState::Playing);
        ctx.process();
        assert_eq!(ctx.current_frame(), 64);
        assert_eq!(consumer.slots(), 128);
    }

    #[test]
    fn suspended_context_applies_messages() {
        let mut ctx = Context::new(48_000).with_queue_size(2);
        let sine = ctx.add(Sine::new(440.0));
        let mut gain = ctx.add(Gain::new(1.0));
        ctx.connect(&sine, &gain);
        ctx.output(&gain);

        assert!(gain.send(GainMessage::Gain(Automation::Set(0.5))).is_ok());
        assert!(gain.send(GainMessage::Gain(Automation::Set(0.25))).is_ok());
        assert!(gain.send(GainMessage::Gain(Automation::Set(0.0))).is_err());

        ctx.process();
        assert!(gain.send(GainMessage::Gain(Automation::Set(0.0))).is_ok());
        assert_eq!(ctx.current_time(), 0.0);
    }

    #[test]
    fn blocked_transport_stays_suspended_and_closes_once() {
        let plays = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let mut ctx = Context::new(44_100).with_transport(CountingTransport {
            plays: plays.clone(),
            closes: closes.clone(),
            blocked: true,
        });

        assert_eq!(ctx.resume(), StreamState::Blocked);
        assert_eq!(ctx.state(), ContextState::Suspended);
        ctx.close();
        assert_eq!(plays.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
