//! Slider position ↔ parameter value transforms.
//!
//! Frequencies use octave sliders: the carrier slider spans nine octaves above
//! [`FCARMIN`], the modulation slider ten octaves above [`FMODMIN`]. Percentage
//! sliders map one to one.

use crate::params::{Field, FCARMIN, FMODMIN};

/// Top of the carrier slider.
pub const CARRIER_OCTAVES: f32 = 9.0;
/// Top of the modulation slider.
pub const MOD_OCTAVES: f32 = 10.0;

pub fn carrier_from_position(position: f32) -> f32 {
    FCARMIN * clamp_position(position, CARRIER_OCTAVES).exp2()
}

pub fn carrier_to_position(carrier_hz: f32) -> f32 {
    clamp_position((carrier_hz / FCARMIN).log2(), CARRIER_OCTAVES)
}

pub fn mod_from_position(position: f32) -> f32 {
    FMODMIN * clamp_position(position, MOD_OCTAVES).exp2()
}

pub fn mod_to_position(mod_hz: f32) -> f32 {
    clamp_position((mod_hz / FMODMIN).log2(), MOD_OCTAVES)
}

/// Map a slider position to the value of `field`.
pub fn value_from_position(field: Field, position: f32) -> f32 {
    match field {
        Field::Carrier => carrier_from_position(position),
        Field::Mod => mod_from_position(position),
        _ => clamp_position(position, 100.0),
    }
}

/// Slider position showing the current value of `field`.
pub fn position_from_value(field: Field, value: f32) -> f32 {
    match field {
        Field::Carrier => carrier_to_position(value),
        Field::Mod => mod_to_position(value),
        _ => clamp_position(value, 100.0),
    }
}

fn clamp_position(position: f32, max: f32) -> f32 {
    if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FCARMAX, FMODMAX};

    #[test]
    fn octave_sliders() {
        assert_eq!(carrier_from_position(0.0), FCARMIN);
        assert!((carrier_from_position(3.0) - 220.0).abs() < 1e-3);
        assert!((carrier_from_position(9.0) - FCARMAX).abs() < 1e-2);
        assert!((mod_from_position(6.0) - 6.4).abs() < 1e-5);
        assert!((mod_from_position(10.0) - FMODMAX).abs() < 1e-3);
    }

    #[test]
    fn positions_outside_the_slider_clamp() {
        assert_eq!(carrier_from_position(-2.0), FCARMIN);
        assert!((carrier_from_position(12.0) - FCARMAX).abs() < 1e-2);
        assert_eq!(value_from_position(Field::Noise, 140.0), 100.0);
        assert_eq!(carrier_to_position(1.0), 0.0);
    }

    #[test]
    fn inverse_transforms() {
        assert!((carrier_to_position(440.0) - 4.0).abs() < 1e-5);
        assert!((mod_to_position(0.8) - 3.0).abs() < 1e-5);
        assert_eq!(position_from_value(Field::Level, 42.0), 42.0);
    }
}
