//! Engine error type.

use std::fmt;

use crate::params::Field;

/// Errors surfaced by the engine to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No audio output capability is available (no device, or the device
    /// refused to open a stream). Fatal for session start.
    EngineUnavailable(String),
    /// Unknown preset name. No generator state was changed.
    InvalidPreset(String),
    /// A value outside the documented domain of a parameter.
    ///
    /// Setters clamp instead of returning this; only
    /// [`GeneratorParameters::validate`](crate::params::GeneratorParameters::validate)
    /// reports it.
    InvalidParameterRange { field: Field, value: f32 },
    /// Generator slot index out of range.
    InvalidSlot(usize),
    /// Rejected engine configuration.
    InvalidConfig(String),
    /// Lifecycle transition that is not valid from the current state.
    InvalidTransition { from: &'static str, to: &'static str },
    /// The session was closed; no further operations are valid.
    SessionClosed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::EngineUnavailable(reason) => write!(f, "audio engine unavailable: {}", reason),
            EngineError::InvalidPreset(name) => write!(f, "unknown preset '{}'", name),
            EngineError::InvalidParameterRange { field, value } => {
                write!(f, "{} value {} is outside its valid range", field.name(), value)
            }
            EngineError::InvalidSlot(slot) => write!(f, "generator slot {} does not exist", slot),
            EngineError::InvalidConfig(reason) => write!(f, "invalid engine configuration: {}", reason),
            EngineError::InvalidTransition { from, to } => {
                write!(f, "cannot transition from {} to {}", from, to)
            }
            EngineError::SessionClosed => write!(f, "session is closed"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_value() {
        let err = EngineError::InvalidParameterRange { field: Field::Carrier, value: 3.0 };
        assert_eq!(err.to_string(), "carrier value 3 is outside its valid range");
        assert_eq!(
            EngineError::InvalidPreset("nap".into()).to_string(),
            "unknown preset 'nap'"
        );
    }
}
