//! Gain/volume control effect

use dasp_graph::Buffer;

use crate::graph::{Inputs, Port};
use crate::node::{AudioNode, ProcessContext};
use crate::param::{Automation, Param};

/// Messages to control gain
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GainMessage {
    /// Automate the gain multiplier (1.0 = unity, 0.0 = silence, negative inverts)
    Gain(Automation),
}

/// A gain stage: sums its signal inputs and scales them by an audio-rate gain.
///
/// Parameter input 0 modulates the gain; the connected signal is added to the
/// automated value, so a modulator through a depth gain produces tremolo
/// around the base value.
///
/// Mono inputs are copied to every output channel.
pub struct Gain {
    gain: Param,
    channels: usize,
    modulation: Buffer,
    gains: Buffer,
    scratch: Buffer,
}

impl Gain {
    /// Create a mono gain node with the specified gain value
    pub fn new(gain: f32) -> Self {
        Self {
            gain: Param::new(gain),
            channels: 1,
            modulation: Buffer::default(),
            gains: Buffer::default(),
            scratch: Buffer::default(),
        }
    }

    /// Create a stereo gain node
    pub fn stereo(gain: f32) -> Self {
        Self::new(gain).with_channels(2)
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels.max(1);
        self
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain.value()
    }
}

impl AudioNode for Gain {
    type Message = GainMessage;

    fn handle_message(&mut self, ctx: &ProcessContext, msg: GainMessage) {
        match msg {
            GainMessage::Gain(automation) => self.gain.apply(ctx, automation),
        }
    }

    fn process(&mut self, ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]) {
        let modulated = inputs.sum_into(Port::Param(0), 0, &mut self.modulation);
        let modulation = if modulated { Some(&self.modulation) } else { None };
        self.gain.render(ctx, modulation, &mut self.gains);

        for (ch, out_buffer) in outputs.iter_mut().enumerate() {
            if !inputs.sum_into(Port::Signal, ch, &mut self.scratch) {
                // No input buffers - output silence
                out_buffer.fill(0.0);
                continue;
            }
            for ((out_sample, &in_sample), &gain) in out_buffer
                .iter_mut()
                .zip(self.scratch.iter())
                .zip(self.gains.iter())
            {
                *out_sample = in_sample * gain;
            }
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { self.channels }

    #[inline]
    fn num_params(&self) -> usize { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AudioGraph;
    use crate::nodes::{RtrbSink, Sine};

    fn ctx() -> ProcessContext {
        ProcessContext { sample_rate: 48_000, buffer_size: 64, frame: 0 }
    }

    /// A constant-valued mono source
    struct Dc(f32);

    impl AudioNode for Dc {
        type Message = ();

        fn process(&mut self, _ctx: &ProcessContext, _inputs: &Inputs, outputs: &mut [Buffer]) {
            outputs[0].fill(self.0);
        }
    }

    #[test]
    fn silent_without_input() {
        let mut gain = Gain::stereo(0.5);
        let mut out = vec![Buffer::default(); 2];
        out[0].fill(1.0);
        gain.process(&ctx(), &Inputs::none(), &mut out);
        assert!(out.iter().all(|b| b.iter().all(|&s| s == 0.0)));
    }

    #[test]
    fn scales_and_upmixes_mono_input() {
        let (producer, mut consumer) = rtrb::RingBuffer::new(256);
        let mut graph = AudioGraph::new(48_000);
        let dc = graph.add_with_queue_size(Dc(0.8), 4);
        let gain = graph.add_with_queue_size(Gain::stereo(0.5), 4);
        let sink = graph.add_with_queue_size(RtrbSink::stereo(producer), 4);
        graph.connect(dc.id(), gain.id(), Port::Signal);
        graph.connect(gain.id(), sink.id(), Port::Signal);
        graph.set_terminal(sink.id());
        graph.process();

        for _ in 0..128 {
            let sample = consumer.pop().unwrap();
            assert!((sample - 0.4).abs() < 1e-6);
        }
    }

    #[test]
    fn modulation_adds_to_the_base_gain() {
        let (producer, mut consumer) = rtrb::RingBuffer::new(256);
        let mut graph = AudioGraph::new(48_000);
        let dc = graph.add_with_queue_size(Dc(1.0), 4);
        let lfo = graph.add_with_queue_size(Sine::new(375.0), 4);
        let depth = graph.add_with_queue_size(Gain::new(0.25), 4);
        let tremolo = graph.add_with_queue_size(Gain::new(0.75), 4);
        let sink = graph.add_with_queue_size(RtrbSink::mono(producer), 4);
        graph.connect(lfo.id(), depth.id(), Port::Signal);
        graph.connect(dc.id(), tremolo.id(), Port::Signal);
        graph.connect(depth.id(), tremolo.id(), Port::Param(0));
        graph.connect(tremolo.id(), sink.id(), Port::Signal);
        graph.set_terminal(sink.id());
        graph.process();

        let samples: Vec<f32> = (0..64).map(|_| consumer.pop().unwrap()).collect();
        let max = samples.iter().cloned().fold(f32::MIN, f32::max);
        let min = samples.iter().cloned().fold(f32::MAX, f32::min);
        // 375 Hz at 48 kHz = 128 samples per cycle, the first block covers the upper half
        assert!((max - 1.0).abs() < 1e-3, "max {}", max);
        assert!((min - 0.75).abs() < 1e-3, "min {}", min);
    }

    #[test]
    fn gain_message_sets_value() {
        let mut gain = Gain::new(1.0);
        gain.handle_message(&ctx(), GainMessage::Gain(Automation::Set(0.0)));
        assert_eq!(gain.gain(), 0.0);
    }
}
