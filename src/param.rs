//! Audio-rate parameters with automation.
//!
//! A [`Param`] produces one value per sample. The value follows the most recent
//! [`Automation`] event; signals connected to the parameter's input port are
//! added on top, sample by sample.

use dasp_graph::Buffer;

use crate::node::ProcessContext;

/// Relative distance below which an exponential approach snaps to its target.
const SETTLE_RATIO: f32 = 1.0e-5;

/// A scheduled change of a parameter's automated value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Automation {
    /// Jump to the value at the start of the next block.
    Set(f32),
    /// Approach `target` exponentially, starting at audio-clock frame
    /// `start_frame`, with `time_constant` in seconds.
    ///
    /// After one time constant the value has covered ~63% of the distance.
    TargetAt {
        target: f32,
        start_frame: u64,
        time_constant: f32,
    },
}

#[derive(Clone, Copy, Debug)]
struct Approach {
    target: f32,
    start_frame: u64,
    coeff: f32,
}

/// An automatable audio parameter.
#[derive(Clone, Debug)]
pub struct Param {
    value: f32,
    approach: Option<Approach>,
    min: f32,
    max: f32,
}

impl Param {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            approach: None,
            min: f32::MIN,
            max: f32::MAX,
        }
    }

    /// Restrict the automated value to `[min, max]`.
    ///
    /// Modulation inputs are not clamped.
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self.value = self.value.clamp(min, max);
        self
    }

    /// Current automated value (without modulation).
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Target of a running approach, or the current value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.approach.map_or(self.value, |a| a.target)
    }

    pub fn apply(&mut self, ctx: &ProcessContext, automation: Automation) {
        match automation {
            Automation::Set(value) => {
                self.value = value.clamp(self.min, self.max);
                self.approach = None;
            }
            Automation::TargetAt { target, start_frame, time_constant } => {
                let target = target.clamp(self.min, self.max);
                let samples = time_constant.max(0.0) * ctx.sample_rate as f32;
                if samples < 1.0 {
                    // Shorter than a sample: nothing to smooth.
                    self.value = target;
                    self.approach = None;
                    return;
                }
                self.approach = Some(Approach {
                    target,
                    start_frame,
                    coeff: (-1.0 / samples).exp(),
                });
            }
        }
    }

    /// Write this block's per-sample values into `out`.
    ///
    /// `modulation`, when present, is added to each sample.
    pub fn render(&mut self, ctx: &ProcessContext, modulation: Option<&Buffer>, out: &mut Buffer) {
        match self.approach {
            None => out.fill(self.value),
            Some(approach) => {
                for (i, sample) in out.iter_mut().enumerate() {
                    if ctx.frame + i as u64 >= approach.start_frame {
                        self.value = approach.target + (self.value - approach.target) * approach.coeff;
                    }
                    *sample = self.value;
                }
                let tolerance = SETTLE_RATIO * approach.target.abs().max(1.0);
                if (self.value - approach.target).abs() <= tolerance {
                    self.value = approach.target;
                    self.approach = None;
                }
            }
        }

        if let Some(modulation) = modulation {
            for (sample, m) in out.iter_mut().zip(modulation.iter()) {
                *sample += *m;
            }
        }
    }
}
