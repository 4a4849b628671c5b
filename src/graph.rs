//! Audio graph - owns nodes and message queues

use core::marker::PhantomData;

use dasp_graph::Buffer;
use hashbrown::HashMap;
use petgraph::graph::NodeIndex;
use petgraph::visit::{DfsPostOrder, EdgeRef, Reversed};
use petgraph::Direction;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::node::{AudioNode, NodeId, ProcessContext};

/// Which input of the destination node an edge feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    /// Ordinary audio input. All signal inputs of a node are summed.
    Signal,
    /// Audio routed into one output channel of a merging node.
    Channel(usize),
    /// Audio-rate modulation added to the node's n-th parameter.
    Param(usize),
}

/// Read-only view of everything connected to the node being processed.
pub struct Inputs<'a> {
    edges: &'a [(Port, usize)],
    buffers: &'a [Vec<Buffer>],
}

impl<'a> Inputs<'a> {
    /// An input view with nothing connected.
    pub fn none() -> Inputs<'static> {
        Inputs { edges: &[], buffers: &[] }
    }

    /// Output buffers of every node connected through `port`.
    pub fn port(&self, port: Port) -> impl Iterator<Item = &'a [Buffer]> + 'a {
        let edges = self.edges;
        let buffers = self.buffers;
        edges
            .iter()
            .filter(move |(p, _)| *p == port)
            .map(move |&(_, src)| buffers[src].as_slice())
    }

    pub fn signals(&self) -> impl Iterator<Item = &'a [Buffer]> + 'a {
        self.port(Port::Signal)
    }

    pub fn is_connected(&self, port: Port) -> bool {
        self.edges.iter().any(|(p, _)| *p == port)
    }

    /// Sum channel `channel` of every input on `port` into `out`.
    ///
    /// Mono inputs feed every channel. Returns `false` (and leaves `out`
    /// silent) when nothing is connected to the port.
    pub fn sum_into(&self, port: Port, channel: usize, out: &mut Buffer) -> bool {
        out.fill(0.0);
        let mut connected = false;
        for input in self.port(port) {
            if input.is_empty() {
                continue;
            }
            connected = true;
            let source = &input[channel.min(input.len() - 1)];
            for (o, s) in out.iter_mut().zip(source.iter()) {
                *o += *s;
            }
        }
        connected
    }
}

/// Internal handle to send messages to a node in an AudioGraph
pub(crate) struct NodeHandle<M: Send + 'static> {
    pub(crate) id: NodeId,
    pub(crate) sender: Producer<M>,
    pub(crate) _marker: PhantomData<M>,
}

impl<M: Send + 'static> NodeHandle<M> {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

// Type-erased wrapper so we can store heterogeneous nodes
trait ErasedNode: Send {
    fn drain_messages(&mut self, ctx: &ProcessContext);
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]);
}

struct NodeWrapper<N: AudioNode> {
    node: N,
    receiver: Consumer<N::Message>,
}

impl<N: AudioNode> ErasedNode for NodeWrapper<N> {
    fn drain_messages(&mut self, ctx: &ProcessContext) {
        while let Ok(msg) = self.receiver.pop() {
            self.node.handle_message(ctx, msg);
        }
    }

    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]) {
        self.drain_messages(ctx);
        self.node.process(ctx, inputs, outputs);
    }
}

struct NodeSlot {
    node: Box<dyn ErasedNode>,
    num_params: usize,
    num_outputs: usize,
}

type InnerGraph = petgraph::graph::Graph<NodeSlot, Port>;

/// An audio processing graph at a fixed sample rate
pub(crate) struct AudioGraph {
    graph: InnerGraph,
    ctx: ProcessContext,

    /// Output buffers, indexed by `NodeIndex::index()`
    buffers: Vec<Vec<Buffer>>,
    /// Scratch list of incoming edges for the node being processed
    edges: Vec<(Port, usize)>,
    /// Cached processing order; rebuilt after the topology changes
    order: Vec<NodeIndex>,
    order_dirty: bool,

    node_indices: HashMap<NodeId, NodeIndex>,
    next_node_id: u32,

    terminal: Option<NodeIndex>,
}

impl AudioGraph {
    /// Create a new graph with the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            graph: InnerGraph::with_capacity(128, 256),
            ctx: ProcessContext {
                sample_rate,
                buffer_size: Buffer::LEN,
                frame: 0,
            },
            buffers: Vec::with_capacity(128),
            edges: Vec::with_capacity(16),
            order: Vec::with_capacity(128),
            order_dirty: true,
            node_indices: HashMap::new(),
            next_node_id: 0,
            terminal: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.ctx.sample_rate
    }

    /// Audio clock: frames rendered so far
    pub fn frame(&self) -> u64 {
        self.ctx.frame
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Add a node with a custom message queue size
    pub fn add_with_queue_size<N: AudioNode>(&mut self, node: N, queue_size: usize) -> NodeHandle<N::Message> {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let (producer, consumer) = RingBuffer::new(queue_size.max(1));

        let num_outputs = node.num_outputs();
        let num_params = node.num_params();
        let wrapper = NodeWrapper { node, receiver: consumer };

        let idx = self.graph.add_node(NodeSlot {
            node: Box::new(wrapper),
            num_params,
            num_outputs,
        });
        debug_assert_eq!(idx.index(), self.buffers.len());
        self.buffers.push(vec![Buffer::default(); num_outputs]);
        self.node_indices.insert(id, idx);
        self.order_dirty = true;

        NodeHandle {
            id,
            sender: producer,
            _marker: PhantomData,
        }
    }

    /// Connect output of `from` to the `port` input of `to`
    ///
    /// # Panics
    ///
    /// Panics if either node is not part of this graph, or if `port` names a
    /// parameter the destination does not have.
    pub fn connect(&mut self, from: NodeId, to: NodeId, port: Port) {
        let from_idx = self.node_indices[&from];
        let to_idx = self.node_indices[&to];
        if let Port::Param(n) = port {
            assert!(
                n < self.graph[to_idx].num_params,
                "node {:?} has no parameter input {}",
                to,
                n
            );
        }
        self.graph.add_edge(from_idx, to_idx, port);
        self.order_dirty = true;
    }

    /// Set which node to process to (typically a sink)
    pub fn set_terminal(&mut self, id: NodeId) {
        self.terminal = Some(self.node_indices[&id]);
        self.order_dirty = true;
    }

    fn rebuild_order(&mut self) {
        self.order.clear();
        if let Some(terminal) = self.terminal {
            let reversed = Reversed(&self.graph);
            let mut dfs = DfsPostOrder::new(reversed, terminal);
            while let Some(idx) = dfs.next(reversed) {
                self.order.push(idx);
            }
        }
        self.order_dirty = false;
    }

    /// Process one block of audio through the graph
    pub fn process(&mut self) {
        if self.order_dirty {
            self.rebuild_order();
        }

        let ctx = self.ctx;
        let AudioGraph { graph, buffers, edges, order, .. } = self;

        for &idx in order.iter() {
            edges.clear();
            for edge in graph.edges_directed(idx, Direction::Incoming) {
                // A self-loop would alias the node's own output
                if edge.source() != idx {
                    edges.push((*edge.weight(), edge.source().index()));
                }
            }

            let mut outputs = core::mem::take(&mut buffers[idx.index()]);
            {
                let inputs = Inputs { edges: edges.as_slice(), buffers: buffers.as_slice() };
                graph[idx].node.process_erased(&ctx, &inputs, &mut outputs);
            }
            debug_assert_eq!(outputs.len(), graph[idx].num_outputs);
            buffers[idx.index()] = outputs;
        }

        self.ctx.frame += Buffer::LEN as u64;
    }

    /// Apply every queued message without rendering audio.
    ///
    /// The audio clock does not advance.
    pub fn drain_messages(&mut self) {
        let ctx = self.ctx;
        for slot in self.graph.node_weights_mut() {
            slot.node.drain_messages(&ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits a constant on one channel.
    struct Constant(f32);

    impl AudioNode for Constant {
        type Message = f32;

        fn handle_message(&mut self, _ctx: &ProcessContext, msg: f32) {
            self.0 = msg;
        }

        fn process(&mut self, _ctx: &ProcessContext, _inputs: &Inputs, outputs: &mut [Buffer]) {
            outputs[0].fill(self.0);
        }
    }

    /// signal * (1 + param) and records what it saw.
    struct Recorder {
        seen: rtrb::Producer<(f32, f32, u64)>,
    }

    impl AudioNode for Recorder {
        type Message = ();

        fn process(&mut self, ctx: &ProcessContext, inputs: &Inputs, _outputs: &mut [Buffer]) {
            let mut signal = Buffer::default();
            let mut param = Buffer::default();
            inputs.sum_into(Port::Signal, 0, &mut signal);
            inputs.sum_into(Port::Param(0), 0, &mut param);
            let _ = self.seen.push((signal[0], param[0], ctx.frame));
        }

        fn num_outputs(&self) -> usize { 0 }
        fn num_params(&self) -> usize { 1 }
    }

    #[test]
    fn ports_keep_signal_and_param_inputs_apart() {
        let (producer, mut consumer) = RingBuffer::new(16);
        let mut graph = AudioGraph::new(48_000);
        let a = graph.add_with_queue_size(Constant(1.0), 4);
        let b = graph.add_with_queue_size(Constant(2.0), 4);
        let c = graph.add_with_queue_size(Constant(4.0), 4);
        let recorder = graph.add_with_queue_size(Recorder { seen: producer }, 4);

        graph.connect(a.id(), recorder.id(), Port::Signal);
        graph.connect(b.id(), recorder.id(), Port::Param(0));
        graph.connect(c.id(), recorder.id(), Port::Signal);
        graph.set_terminal(recorder.id());

        graph.process();
        graph.process();

        assert_eq!(consumer.pop(), Ok((5.0, 2.0, 0)));
        assert_eq!(consumer.pop(), Ok((5.0, 2.0, 64)));
        assert_eq!(graph.frame(), 128);
    }

    #[test]
    fn draining_applies_messages_without_advancing_the_clock() {
        let (producer, mut consumer) = RingBuffer::new(16);
        let mut graph = AudioGraph::new(48_000);
        let mut source = graph.add_with_queue_size(Constant(1.0), 4);
        let recorder = graph.add_with_queue_size(Recorder { seen: producer }, 4);
        graph.connect(source.id(), recorder.id(), Port::Signal);
        graph.set_terminal(recorder.id());

        source.sender.push(3.0).unwrap();
        graph.drain_messages();
        assert_eq!(graph.frame(), 0);
        assert!(consumer.pop().is_err());

        graph.process();
        assert_eq!(consumer.pop(), Ok((3.0, 0.0, 0)));
    }

    #[test]
    #[should_panic]
    fn connecting_to_a_missing_param_panics() {
        let mut graph = AudioGraph::new(48_000);
        let a = graph.add_with_queue_size(Constant(1.0), 4);
        let b = graph.add_with_queue_size(Constant(1.0), 4);
        graph.connect(a.id(), b.id(), Port::Param(0));
    }
}
