//! Ring buffer sink for custom audio processing

use dasp_graph::Buffer;
use rtrb::Producer;

use crate::graph::{Inputs, Port};
use crate::node::{AudioNode, ProcessContext};

/// A sink that pushes audio into an rtrb ring buffer
///
/// Useful for:
/// - Headless sessions and tests
/// - Sending audio to another thread
/// - Recording/analysis
pub struct RtrbSink {
    producer: Producer<f32>,
    channels: usize,
    mixes: Vec<Buffer>,
}

impl RtrbSink {
    /// Create a sink that writes interleaved samples to the given producer
    pub fn new(producer: Producer<f32>, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            producer,
            channels,
            mixes: vec![Buffer::default(); channels],
        }
    }

    /// Create a sink for mono audio
    pub fn mono(producer: Producer<f32>) -> Self {
        Self::new(producer, 1)
    }

    /// Create a sink for stereo audio
    pub fn stereo(producer: Producer<f32>) -> Self {
        Self::new(producer, 2)
    }

    /// Returns how many sample slots are available
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }
}

impl AudioNode for RtrbSink {
    type Message = (); // No control messages

    fn process(&mut self, _ctx: &ProcessContext, inputs: &Inputs, _outputs: &mut [Buffer]) {
        let samples_needed = Buffer::LEN * self.channels;

        // Skip if buffer is full
        if self.producer.slots() < samples_needed {
            return;
        }

        for (ch, mix) in self.mixes.iter_mut().enumerate() {
            inputs.sum_into(Port::Signal, ch, mix);
        }

        // Interleave channels
        for i in 0..Buffer::LEN {
            for mix in self.mixes.iter() {
                // Safety: we verified slots above
                let _ = self.producer.push(mix[i]);
            }
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
