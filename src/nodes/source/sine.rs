//! Sine wave oscillator

use dasp_graph::Buffer;

use crate::graph::{Inputs, Port};
use crate::node::{AudioNode, ProcessContext};
use crate::param::{Automation, Param};

/// Messages to control a Sine oscillator
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SineMessage {
    Frequency(Automation),
}

/// A sine wave oscillator (mono source)
///
/// Parameter input 0 is frequency modulation: connected signals are added to
/// the frequency in Hz, sample by sample. Negative instantaneous frequencies
/// run the phase backwards.
pub struct Sine {
    frequency: Param,
    phase: f32,
    modulation: Buffer,
    instantaneous: Buffer,
}

impl Sine {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency: Param::new(frequency),
            phase: 0.0,
            modulation: Buffer::default(),
            instantaneous: Buffer::default(),
        }
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency.value()
    }
}

impl AudioNode for Sine {
    type Message = SineMessage;

    fn handle_message(&mut self, ctx: &ProcessContext, msg: SineMessage) {
        match msg {
            SineMessage::Frequency(automation) => self.frequency.apply(ctx, automation),
        }
    }

    fn process(&mut self, ctx: &ProcessContext, inputs: &Inputs, outputs: &mut [Buffer]) {
        let modulated = inputs.sum_into(Port::Param(0), 0, &mut self.modulation);
        let modulation = if modulated { Some(&self.modulation) } else { None };
        self.frequency.render(ctx, modulation, &mut self.instantaneous);

        let Some(first) = outputs.first_mut() else { return };
        let inv_rate = 1.0 / ctx.sample_rate as f32;

        for (sample, freq) in first.iter_mut().zip(self.instantaneous.iter()) {
            *sample = (self.phase * core::f32::consts::TAU).sin();
            self.phase = (self.phase + freq * inv_rate).rem_euclid(1.0);
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }

    #[inline]
    fn num_params(&self) -> usize { 1 }
}
