//! CPAL device discovery and sink creation

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::EngineError;
use crate::nodes::{CpalSink, CpalTransport};

/// A discovered audio output device
pub struct CpalDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,

    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalDevice {
    /// Get the default output device
    pub fn default_output() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::EngineUnavailable("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| EngineError::EngineUnavailable(e.to_string()))?;
        Ok(Self::from_parts(device, config))
    }

    fn from_parts(device: cpal::Device, config: cpal::SupportedStreamConfig) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
        }
    }

    /// Switch to a stream configuration running at `sample_rate`.
    ///
    /// Keeps the current configuration (and logs a warning) when the device
    /// offers no matching range.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate {
            return self;
        }
        let wanted = cpal::SampleRate(sample_rate);
        let matching = self.device.supported_output_configs().ok().and_then(|mut ranges| {
            ranges.find(|range| {
                range.channels() == self.channels
                    && range.min_sample_rate() <= wanted
                    && wanted <= range.max_sample_rate()
            })
        });
        match matching {
            Some(range) => {
                self.config = range.with_sample_rate(wanted);
                self.sample_rate = sample_rate;
            }
            None => tracing::warn!(
                device = %self.name,
                requested = sample_rate,
                using = self.sample_rate,
                "sample rate not supported by device"
            ),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Create a sink node that outputs to this device, with the transport
    /// that starts and stops it
    pub fn create_sink(&self) -> Result<(CpalSink, CpalTransport), EngineError> {
        CpalSink::open(&self.device, &self.config)
    }
}
