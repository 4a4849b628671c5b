//! Looping player for the shared noise buffer

use dasp_graph::Buffer;

use crate::graph::Inputs;
use crate::node::{AudioNode, ProcessContext};
use crate::noise::SharedNoise;

/// Loops a [`SharedNoise`] buffer forever (mono source).
///
/// Players only read the buffer; any number of them can share one.
pub struct NoisePlayer {
    noise: SharedNoise,
    position: usize,
}

impl NoisePlayer {
    pub fn new(noise: SharedNoise) -> Self {
        Self { noise, position: 0 }
    }

    /// Start reading `offset` samples into the buffer.
    ///
    /// Two players on the same buffer with different offsets give
    /// uncorrelated outputs.
    pub fn with_offset(mut self, offset: usize) -> Self {
        if !self.noise.is_empty() {
            self.position = offset % self.noise.len();
        }
        self
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl AudioNode for NoisePlayer {
    type Message = ();

    fn process(&mut self, _ctx: &ProcessContext, _inputs: &Inputs, outputs: &mut [Buffer]) {
        let Some(first) = outputs.first_mut() else { return };
        let samples = self.noise.samples();
        if samples.is_empty() {
            first.fill(0.0);
            return;
        }

        for sample in first.iter_mut() {
            *sample = samples[self.position];
            self.position += 1;
            if self.position == samples.len() {
                self.position = 0;
            }
        }
    }
}
