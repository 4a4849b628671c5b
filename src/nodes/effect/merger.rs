//! Channel merger effect

use dasp_graph::Buffer;

use crate::graph::{Inputs, Port};
use crate::node::{AudioNode, ProcessContext};

/// Builds a multi-channel signal from mono inputs.
///
/// Inputs connected through [`Port::Channel(n)`](Port::Channel) land on output
/// channel `n`; several inputs on the same channel are summed. Channels with
/// nothing connected are silent.
pub struct Merger {
    channels: usize,
}

impl Merger {
    pub fn new(channels: usize) -> Self {
        Self { channels: channels.max(1) }
    }

    pub fn stereo() -> Self {
        Self::new(2)
    }
}

impl AudioNode for Merger {
    type Message = ();

    fn process(&mut self, _ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]) {
        for (ch, out) in outputs.iter_mut().enumerate() {
            // channel 0 of each input: mergers take mono sources
            inputs.sum_into(Port::Channel(ch), 0, out);
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { self.channels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AudioGraph;
    use crate::nodes::{Gain, RtrbSink, Sine};

    #[test]
    fn routes_inputs_to_their_channels() {
        let (producer, mut consumer) = rtrb::RingBuffer::new(256);
        let mut graph = AudioGraph::new(48_000);
        let tone = graph.add_with_queue_size(Sine::new(750.0), 4);
        let half = graph.add_with_queue_size(Gain::new(0.5), 4);
        let merger = graph.add_with_queue_size(Merger::stereo(), 4);
        let sink = graph.add_with_queue_size(RtrbSink::stereo(producer), 4);
        graph.connect(tone.id(), half.id(), Port::Signal);
        graph.connect(tone.id(), merger.id(), Port::Channel(0));
        graph.connect(half.id(), merger.id(), Port::Channel(1));
        graph.connect(merger.id(), sink.id(), Port::Signal);
        graph.set_terminal(sink.id());
        graph.process();

        for _ in 0..64 {
            let left = consumer.pop().unwrap();
            let right = consumer.pop().unwrap();
            assert!((right - left * 0.5).abs() < 1e-6);
        }
    }
}
