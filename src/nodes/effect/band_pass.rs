//! Band-pass filter effect

use biquad::{Biquad, Coefficients, DirectForm2Transposed};
use dasp_graph::Buffer;

use crate::graph::{Inputs, Port};
use crate::node::{AudioNode, ProcessContext};
use crate::param::{Automation, Param};

/// Lowest centre frequency the filter will be tuned to.
const MIN_CENTER_HZ: f32 = 10.0;

/// Messages to control a band-pass filter
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BandPassMessage {
    Center(Automation),
    SetQ(f32),
}

/// A mono biquad band-pass filter (constant 0 dB peak gain).
///
/// Parameter input 0 modulates the centre frequency in Hz. Coefficients are
/// refreshed once per block from the block's first centre value.
pub struct BandPass {
    center: Param,
    q: f32,
    filter: DirectForm2Transposed<f32>,
    tuned: Option<(f32, f32, u32)>,
    modulation: Buffer,
    centers: Buffer,
    input: Buffer,
}

impl BandPass {
    pub fn new(center_hz: f32, q: f32) -> Self {
        // Placeholder coefficients; replaced on the first block once the
        // sample rate is known.
        let identity = Coefficients { a1: 0.0, a2: 0.0, b0: 1.0, b1: 0.0, b2: 0.0 };
        Self {
            center: Param::new(center_hz),
            q: q.max(f32::EPSILON),
            filter: DirectForm2Transposed::<f32>::new(identity),
            tuned: None,
            modulation: Buffer::default(),
            centers: Buffer::default(),
            input: Buffer::default(),
        }
    }

    #[inline]
    pub fn center(&self) -> f32 {
        self.center.value()
    }

    #[inline]
    pub fn q(&self) -> f32 {
        self.q
    }

    fn retune(&mut self, center: f32, sample_rate: u32) {
        let nyquist = sample_rate as f32 * 0.5;
        let center = center.abs().clamp(MIN_CENTER_HZ, nyquist * 0.98);
        if self.tuned == Some((center, self.q, sample_rate)) {
            return;
        }
        self.filter.update_coefficients(band_pass_coefficients(center, self.q, sample_rate as f32));
        self.tuned = Some((center, self.q, sample_rate));
    }
}

/// RBJ cookbook band-pass, normalized so the peak at `center` is 0 dB.
fn band_pass_coefficients(center: f32, q: f32, sample_rate: f32) -> Coefficients<f32> {
    let omega = core::f32::consts::TAU * center / sample_rate;
    let alpha = omega.sin() / (2.0 * q);
    let a0 = 1.0 + alpha;
    Coefficients {
        a1: -2.0 * omega.cos() / a0,
        a2: (1.0 - alpha) / a0,
        b0: alpha / a0,
        b1: 0.0,
        b2: -alpha / a0,
    }
}

impl AudioNode for BandPass {
    type Message = BandPassMessage;

    fn handle_message(&mut self, ctx: &ProcessContext, msg: BandPassMessage) {
        match msg {
            BandPassMessage::Center(automation) => self.center.apply(ctx, automation),
            BandPassMessage::SetQ(q) => self.q = q.max(f32::EPSILON),
        }
    }

    fn process(&mut self, ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]) {
        let modulated = inputs.sum_into(Port::Param(0), 0, &mut self.modulation);
        let modulation = if modulated { Some(&self.modulation) } else { None };
        self.center.render(ctx, modulation, &mut self.centers);
        let center = self.centers[0];
        self.retune(center, ctx.sample_rate);

        let Some(first) = outputs.first_mut() else { return };
        inputs.sum_into(Port::Signal, 0, &mut self.input);
        for (out, &x) in first.iter_mut().zip(self.input.iter()) {
            *out = self.filter.run(x);
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }

    #[inline]
    fn num_params(&self) -> usize { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AudioGraph;
    use crate::nodes::{RtrbSink, Sine};

    /// Peak level of a sine at `freq` through a band-pass centred on 1 kHz.
    fn peak_through(freq: f32) -> f32 {
        let (producer, mut consumer) = rtrb::RingBuffer::new(64 * 64);
        let mut graph = AudioGraph::new(48_000);
        let sine = graph.add_with_queue_size(Sine::new(freq), 4);
        let filter = graph.add_with_queue_size(BandPass::new(1_000.0, 2.0), 4);
        let sink = graph.add_with_queue_size(RtrbSink::mono(producer), 4);
        graph.connect(sine.id(), filter.id(), Port::Signal);
        graph.connect(filter.id(), sink.id(), Port::Signal);
        graph.set_terminal(sink.id());
        for _ in 0..64 {
            graph.process();
        }

        let samples: Vec<f32> = core::iter::from_fn(|| consumer.pop().ok()).collect();
        // skip the transient
        samples[1024..].iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn passes_the_centre_frequency() {
        let at_center = peak_through(1_000.0);
        let below = peak_through(150.0);
        let above = peak_through(8_000.0);
        assert!((at_center - 1.0).abs() < 0.05, "centre peak {}", at_center);
        assert!(at_center > below * 3.0, "centre {} vs low {}", at_center, below);
        assert!(at_center > above * 3.0, "centre {} vs high {}", at_center, above);
    }

    #[test]
    fn centre_beyond_nyquist_is_clamped() {
        let mut filter = BandPass::new(30_000.0, 2.0);
        let ctx = ProcessContext { sample_rate: 48_000, buffer_size: 64, frame: 0 };
        let mut out = vec![Buffer::default()];
        filter.process(&ctx, &Inputs::none(), &mut out);
        let (center, _, _) = filter.tuned.unwrap();
        assert!(center < 24_000.0);
        assert!(out[0].iter().all(|s| s.is_finite()));
    }

    #[test]
    fn messages_update_centre_and_q() {
        let ctx = ProcessContext { sample_rate: 48_000, buffer_size: 64, frame: 0 };
        let mut filter = BandPass::new(440.0, 2.0);
        filter.handle_message(&ctx, BandPassMessage::Center(Automation::Set(880.0)));
        filter.handle_message(&ctx, BandPassMessage::SetQ(4.0));
        assert_eq!(filter.center(), 880.0);
        assert_eq!(filter.q(), 4.0);
    }
}
