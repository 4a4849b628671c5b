//! Shared broadband noise buffer.

use std::sync::Arc;

use rand::Rng;

use crate::error::EngineError;

/// Length of the shared noise buffer in seconds.
pub const NOISE_SECONDS: f32 = 6.0;

/// Amplification applied to the uniform samples. The result is deliberately
/// over range; band-pass filtering and gain staging bring it back down.
pub const NOISE_SCALE: f32 = 3.0;

/// A fixed block of white noise, generated once and shared read-only by every
/// noise player of every generator.
#[derive(Debug)]
pub struct NoiseBuffer {
    samples: Box<[f32]>,
    sample_rate: u32,
}

/// The aliasable handle noise players hold.
pub type SharedNoise = Arc<NoiseBuffer>;

impl NoiseBuffer {
    /// `6 × sample_rate` samples of `3·(2u − 1)`, `u` uniform in `[0, 1)`.
    pub fn generate<R: Rng + ?Sized>(sample_rate: u32, rng: &mut R) -> Result<Self, EngineError> {
        Self::generate_with(sample_rate, NOISE_SECONDS, NOISE_SCALE, rng)
    }

    pub fn generate_with<R: Rng + ?Sized>(
        sample_rate: u32,
        seconds: f32,
        scale: f32,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidConfig("noise buffer needs a positive sample rate".into()));
        }
        let len = (seconds * sample_rate as f32) as usize;
        if len == 0 {
            return Err(EngineError::InvalidConfig("noise buffer length must be positive".into()));
        }

        let samples = (0..len)
            .map(|_| scale * (rng.gen::<f32>() * 2.0 - 1.0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(len, sample_rate, "generated shared noise buffer");
        Ok(Self { samples, sample_rate })
    }

    pub fn shared(self) -> SharedNoise {
        Arc::new(self)
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn six_seconds_of_over_range_noise() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = NoiseBuffer::generate(8_000, &mut rng).unwrap();
        assert_eq!(noise.len(), 48_000);
        assert!(noise.samples().iter().all(|s| (-3.0..3.0).contains(s)));
        assert!(noise.samples().iter().any(|s| s.abs() > 1.0), "noise should exceed unit range");

        let mean = noise.samples().iter().sum::<f32>() / noise.len() as f32;
        assert!(mean.abs() < 0.05, "mean {} should be close to zero", mean);
    }

    #[test]
    fn same_seed_same_noise() {
        let a = NoiseBuffer::generate(1_000, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = NoiseBuffer::generate(1_000, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let err = NoiseBuffer::generate(0, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }
}
