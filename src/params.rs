//! Generator parameters and the per-session parameter store.

use std::fmt;

use crate::error::EngineError;

/// Lowest carrier frequency in Hz (A0).
pub const FCARMIN: f32 = 27.5;
/// Highest carrier frequency in Hz, nine octaves above [`FCARMIN`].
pub const FCARMAX: f32 = FCARMIN * 512.0;
/// Lowest modulation frequency in Hz.
pub const FMODMIN: f32 = 0.1;
/// Highest modulation frequency in Hz, ten octaves above [`FMODMIN`].
pub const FMODMAX: f32 = FMODMIN * 1024.0;
/// Number of generator slots in a session.
pub const SLOT_COUNT: usize = 5;

/// One of the eight parameters of a generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Carrier,
    Mod,
    Isochronic,
    Binaural,
    Bilateral,
    Fm,
    Noise,
    Level,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Carrier,
        Field::Mod,
        Field::Isochronic,
        Field::Binaural,
        Field::Bilateral,
        Field::Fm,
        Field::Noise,
        Field::Level,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Carrier => "carrier",
            Field::Mod => "mod",
            Field::Isochronic => "isochronic",
            Field::Binaural => "binaural",
            Field::Bilateral => "bilateral",
            Field::Fm => "fm",
            Field::Noise => "noise",
            Field::Level => "level",
        }
    }

    /// Inclusive `(min, max)` domain.
    pub fn range(self) -> (f32, f32) {
        match self {
            Field::Carrier => (FCARMIN, FCARMAX),
            Field::Mod => (FMODMIN, FMODMAX),
            _ => (0.0, 100.0),
        }
    }

    pub fn contains(self, value: f32) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&value)
    }

    /// Clamp `value` into the domain. NaN maps to the lower bound.
    pub fn clamp(self, value: f32) -> f32 {
        if self.contains(value) {
            return value;
        }
        let (min, max) = self.range();
        let clamped = if value > max { max } else { min };
        tracing::debug!(field = self.name(), value, clamped, "parameter clamped");
        clamped
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The eight-parameter state of one generator.
///
/// A plain value: updates produce a new value that replaces the stored one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneratorParameters {
    pub carrier_hz: f32,
    pub mod_hz: f32,
    pub isochronic_pct: f32,
    pub binaural_pct: f32,
    pub bilateral_pct: f32,
    pub fm_pct: f32,
    pub noise_pct: f32,
    pub level_pct: f32,
}

impl Default for GeneratorParameters {
    fn default() -> Self {
        Self {
            carrier_hz: 220.0,
            mod_hz: 6.4,
            isochronic_pct: 50.0,
            binaural_pct: 50.0,
            bilateral_pct: 0.0,
            fm_pct: 0.0,
            noise_pct: 0.0,
            level_pct: 50.0,
        }
    }
}

impl GeneratorParameters {
    /// Initial parameters of a slot: only slot 0 is audible.
    pub fn defaults_for_slot(slot: usize) -> Self {
        let level_pct = if slot == 0 { 50.0 } else { 0.0 };
        Self { level_pct, ..Self::default() }
    }

    pub fn get(&self, field: Field) -> f32 {
        match field {
            Field::Carrier => self.carrier_hz,
            Field::Mod => self.mod_hz,
            Field::Isochronic => self.isochronic_pct,
            Field::Binaural => self.binaural_pct,
            Field::Bilateral => self.bilateral_pct,
            Field::Fm => self.fm_pct,
            Field::Noise => self.noise_pct,
            Field::Level => self.level_pct,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut f32 {
        match field {
            Field::Carrier => &mut self.carrier_hz,
            Field::Mod => &mut self.mod_hz,
            Field::Isochronic => &mut self.isochronic_pct,
            Field::Binaural => &mut self.binaural_pct,
            Field::Bilateral => &mut self.bilateral_pct,
            Field::Fm => &mut self.fm_pct,
            Field::Noise => &mut self.noise_pct,
            Field::Level => &mut self.level_pct,
        }
    }

    /// Copy with `field` set to `value`, clamped into its domain.
    pub fn with(mut self, field: Field, value: f32) -> Self {
        *self.slot_mut(field) = field.clamp(value);
        self
    }

    /// Copy with every field clamped into its domain.
    pub fn clamped(self) -> Self {
        Field::ALL.iter().fold(self, |params, &field| params.with(field, params.get(field)))
    }

    /// Strict check: the first field outside its domain is reported.
    pub fn validate(&self) -> Result<(), EngineError> {
        for &field in Field::ALL.iter() {
            let value = self.get(field);
            if !field.contains(value) {
                return Err(EngineError::InvalidParameterRange { field, value });
            }
        }
        Ok(())
    }
}

/// Parameters of all generator slots. Slots are never removed, only replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterStore {
    slots: [GeneratorParameters; SLOT_COUNT],
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        let mut slots = [GeneratorParameters::default(); SLOT_COUNT];
        for (slot, params) in slots.iter_mut().enumerate() {
            *params = GeneratorParameters::defaults_for_slot(slot);
        }
        Self { slots }
    }

    pub fn get(&self, slot: usize) -> Result<&GeneratorParameters, EngineError> {
        self.slots.get(slot).ok_or(EngineError::InvalidSlot(slot))
    }

    /// Store a new value for `slot`, clamped into the parameter domains.
    pub fn replace(&mut self, slot: usize, params: GeneratorParameters) -> Result<(), EngineError> {
        let stored = self.slots.get_mut(slot).ok_or(EngineError::InvalidSlot(slot))?;
        *stored = params.clamped();
        Ok(())
    }

    pub fn slots(&self) -> &[GeneratorParameters; SLOT_COUNT] {
        &self.slots
    }
}
