//! Engine configuration.

use crate::error::EngineError;
use crate::noise::{NOISE_SCALE, NOISE_SECONDS};

/// Which frequency-valued controls are changed through a smoothing ramp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrequencySmoothing {
    /// Ramp only the two modulation-rate oscillators; carrier tones and the
    /// filter centres jump.
    ModulationOnly,
    /// Ramp every frequency-valued control.
    AllFrequencies,
}

impl Default for FrequencySmoothing {
    fn default() -> Self {
        FrequencySmoothing::AllFrequencies
    }
}

/// Tunables for a [`Session`](crate::Session).
///
/// ```
/// use entrain::{EngineConfig, FrequencySmoothing};
///
/// let config = EngineConfig::default()
///     .with_seed(42)
///     .with_smoothing(FrequencySmoothing::ModulationOnly);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Output sample rate; `None` uses the device default.
    pub sample_rate: Option<u32>,
    pub noise_seconds: f32,
    pub noise_scale: f32,
    /// Q of the noise band-pass filters.
    pub filter_q: f32,
    /// Time constant of frequency ramps, in seconds.
    pub ramp_time_constant: f32,
    pub smoothing: FrequencySmoothing,
    /// Capacity of each node's control queue.
    pub queue_size: usize,
    /// Seed for the noise buffer and preset randomization. `None` seeds from
    /// the operating system.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            noise_seconds: NOISE_SECONDS,
            noise_scale: NOISE_SCALE,
            filter_q: 2.0,
            ramp_time_constant: 0.001,
            smoothing: FrequencySmoothing::default(),
            queue_size: 64,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_noise(mut self, seconds: f32, scale: f32) -> Self {
        self.noise_seconds = seconds;
        self.noise_scale = scale;
        self
    }

    pub fn with_filter_q(mut self, q: f32) -> Self {
        self.filter_q = q;
        self
    }

    pub fn with_ramp_time_constant(mut self, seconds: f32) -> Self {
        self.ramp_time_constant = seconds;
        self
    }

    pub fn with_smoothing(mut self, smoothing: FrequencySmoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        fn positive(name: &str, value: f32) -> Result<(), EngineError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!("{} must be positive, got {}", name, value)))
            }
        }

        if self.sample_rate == Some(0) {
            return Err(EngineError::InvalidConfig("sample_rate must be positive".into()));
        }
        positive("noise_seconds", self.noise_seconds)?;
        positive("noise_scale", self.noise_scale)?;
        positive("filter_q", self.filter_q)?;
        if !(self.ramp_time_constant >= 0.0 && self.ramp_time_constant.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "ramp_time_constant must not be negative, got {}",
                self.ramp_time_constant
            )));
        }
        if self.queue_size == 0 {
            return Err(EngineError::InvalidConfig("queue_size must be positive".into()));
        }
        Ok(())
    }
}
