//! Mixer effect - sums multiple inputs together

use dasp_graph::Buffer;

use crate::graph::{Inputs, Port};
use crate::node::{AudioNode, ProcessContext};

/// A mixer that sums multiple inputs together
///
/// Each input is summed with equal weight. The output has `channels` channels.
/// If an input has fewer channels, it will be upmixed (mono→stereo copies to both).
/// If an input has more channels, extra channels are ignored.
pub struct Mixer {
    channels: usize,
}

impl Mixer {
    /// Create a new mixer with the specified number of output channels
    pub fn new(channels: usize) -> Self {
        Self { channels: channels.max(1) }
    }

    /// Create a stereo mixer
    pub fn stereo() -> Self {
        Self::new(2)
    }
}

impl AudioNode for Mixer {
    type Message = ();

    fn process(&mut self, _ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]) {
        for (ch, out) in outputs.iter_mut().enumerate() {
            inputs.sum_into(Port::Signal, ch, out);
        }
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }
}
