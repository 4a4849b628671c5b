//! Named presets and randomization.
//!
//! Brainwave presets pick a modulation rate in the band associated with a
//! state of mind; device presets pick a carrier the playback device reproduces
//! well plus a spatial mix that works on it. Fields a preset does not mention
//! keep their current value.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::EngineError;
use crate::params::{Field, GeneratorParameters};
use crate::sliders::{carrier_from_position, mod_from_position, CARRIER_OCTAVES, MOD_OCTAVES};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Randomize everything.
    Anything,
    Sleep,
    Dream,
    Creative,
    Relax,
    Productivity,
    Alert,
    Headphones,
    Mobile,
    Speaker1,
    Speaker2,
    Sub,
    Hearing,
}

/// Device mix: carrier band, bilateral and isochronic ranges, and the
/// fm fall-off `clamp(fm_base − fm_slope·carrier, 0, 100)`.
struct DeviceMix {
    carrier: (f32, f32),
    binaural: f32,
    bilateral: Option<(f32, f32)>,
    isochronic: (f32, f32),
    fm_base: f32,
    fm_slope: f32,
}

impl Preset {
    pub const ALL: [Preset; 13] = [
        Preset::Anything,
        Preset::Sleep,
        Preset::Dream,
        Preset::Creative,
        Preset::Relax,
        Preset::Productivity,
        Preset::Alert,
        Preset::Headphones,
        Preset::Mobile,
        Preset::Speaker1,
        Preset::Speaker2,
        Preset::Sub,
        Preset::Hearing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Anything => "anything",
            Preset::Sleep => "sleep",
            Preset::Dream => "dream",
            Preset::Creative => "creative",
            Preset::Relax => "relax",
            Preset::Productivity => "productivity",
            Preset::Alert => "alert",
            Preset::Headphones => "headphones",
            Preset::Mobile => "mobile",
            Preset::Speaker1 => "speaker1",
            Preset::Speaker2 => "speaker2",
            Preset::Sub => "sub",
            Preset::Hearing => "hearing",
        }
    }

    /// Modulation band `[lo, hi)` of the brainwave presets.
    pub fn mod_band(self) -> Option<(f32, f32)> {
        match self {
            Preset::Sleep => Some((0.25, 2.0)),
            Preset::Dream => Some((2.0, 6.0)),
            Preset::Creative => Some((6.0, 8.0)),
            Preset::Relax => Some((8.0, 14.0)),
            Preset::Productivity => Some((14.0, 20.0)),
            Preset::Alert => Some((20.0, 60.0)),
            _ => None,
        }
    }

    fn device_mix(self) -> Option<DeviceMix> {
        let mix = match self {
            Preset::Headphones => DeviceMix {
                carrier: (75.0, 300.0),
                binaural: 100.0,
                bilateral: None,
                isochronic: (0.0, 50.0),
                fm_base: 175.0,
                fm_slope: 1.0,
            },
            Preset::Mobile => DeviceMix {
                carrier: (300.0, 1000.0),
                binaural: 0.0,
                bilateral: Some((25.0, 75.0)),
                isochronic: (50.0, 100.0),
                fm_base: 100.0,
                fm_slope: 0.1,
            },
            Preset::Speaker1 => DeviceMix {
                carrier: (150.0, 500.0),
                binaural: 0.0,
                bilateral: Some((50.0, 100.0)),
                isochronic: (25.0, 75.0),
                fm_base: 250.0,
                fm_slope: 0.5,
            },
            Preset::Speaker2 => DeviceMix {
                carrier: (60.0, 250.0),
                binaural: 0.0,
                bilateral: Some((75.0, 100.0)),
                isochronic: (25.0, 75.0),
                fm_base: 125.0,
                fm_slope: 0.5,
            },
            Preset::Sub => DeviceMix {
                carrier: (27.5, 80.0),
                binaural: 0.0,
                bilateral: None,
                isochronic: (50.0, 100.0),
                fm_base: 100.0,
                fm_slope: 1.0,
            },
            Preset::Hearing => DeviceMix {
                carrier: (500.0, 2000.0),
                binaural: 0.0,
                bilateral: Some((0.0, 50.0)),
                isochronic: (75.0, 100.0),
                fm_base: 50.0,
                fm_slope: 0.025,
            },
            _ => return None,
        };
        Some(mix)
    }

    /// New parameters for one slot, starting from `current`.
    pub fn apply<R: Rng + ?Sized>(self, current: &GeneratorParameters, rng: &mut R) -> GeneratorParameters {
        if self == Preset::Anything {
            return GeneratorParameters {
                carrier_hz: carrier_from_position(rng.gen_range(0.0..CARRIER_OCTAVES)),
                mod_hz: mod_from_position(rng.gen_range(0.0..MOD_OCTAVES)),
                isochronic_pct: rng.gen_range(0.0..100.0),
                binaural_pct: rng.gen_range(0.0..100.0),
                bilateral_pct: rng.gen_range(0.0..100.0),
                fm_pct: rng.gen_range(0.0..100.0),
                noise_pct: rng.gen_range(0.0..100.0),
                level_pct: rng.gen_range(0.0..100.0),
            }
            .clamped();
        }

        if let Some((lo, hi)) = self.mod_band() {
            return current.with(Field::Mod, rng.gen_range(lo..hi));
        }

        match self.device_mix() {
            Some(mix) => {
                let carrier = rng.gen_range(mix.carrier.0..mix.carrier.1);
                let bilateral = match mix.bilateral {
                    Some((lo, hi)) => rng.gen_range(lo..hi),
                    None => 0.0,
                };
                let isochronic = rng.gen_range(mix.isochronic.0..mix.isochronic.1);
                let fm = (mix.fm_base - mix.fm_slope * carrier).clamp(0.0, 100.0);
                current
                    .with(Field::Carrier, carrier)
                    .with(Field::Binaural, mix.binaural)
                    .with(Field::Bilateral, bilateral)
                    .with(Field::Isochronic, isochronic)
                    .with(Field::Fm, fm)
            }
            None => *current,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Preset::ALL
            .iter()
            .copied()
            .find(|preset| preset.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::InvalidPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FCARMAX, FCARMIN, FMODMAX, FMODMIN};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn names_round_trip() {
        for preset in Preset::ALL.iter() {
            assert_eq!(preset.name().parse::<Preset>(), Ok(*preset));
        }
        assert_eq!("Sleep".parse::<Preset>(), Ok(Preset::Sleep));
        assert_eq!("nap".parse::<Preset>(), Err(EngineError::InvalidPreset("nap".into())));
    }

    #[test]
    fn brainwave_presets_only_touch_the_modulation_rate() {
        let mut rng = StdRng::seed_from_u64(11);
        let current = GeneratorParameters::default().with(Field::Carrier, 333.0);
        for _ in 0..500 {
            let sleep = Preset::Sleep.apply(&current, &mut rng);
            assert!((0.25..2.0).contains(&sleep.mod_hz), "sleep mod {}", sleep.mod_hz);
            assert_eq!(sleep.with(Field::Mod, current.mod_hz), current);

            let alert = Preset::Alert.apply(&current, &mut rng);
            assert!((20.0..60.0).contains(&alert.mod_hz), "alert mod {}", alert.mod_hz);
        }
    }

    #[test]
    fn device_presets_derive_fm_from_the_carrier() {
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..500 {
            let p = Preset::Headphones.apply(&GeneratorParameters::default(), &mut rng);
            assert!((75.0..300.0).contains(&p.carrier_hz));
            assert_eq!(p.binaural_pct, 100.0);
            assert_eq!(p.bilateral_pct, 0.0);
            assert!((0.0..50.0).contains(&p.isochronic_pct));
            assert_eq!(p.fm_pct, (175.0 - p.carrier_hz).clamp(0.0, 100.0));

            let p = Preset::Sub.apply(&GeneratorParameters::default(), &mut rng);
            assert!((FCARMIN..80.0).contains(&p.carrier_hz));
            assert!(p.fm_pct >= 20.0);

            let p = Preset::Hearing.apply(&GeneratorParameters::default(), &mut rng);
            assert!((500.0..2000.0).contains(&p.carrier_hz));
            assert!((75.0..100.0).contains(&p.isochronic_pct));
        }
    }

    #[test]
    fn anything_stays_in_domain() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..500 {
            let p = Preset::Anything.apply(&GeneratorParameters::default(), &mut rng);
            assert!(p.validate().is_ok(), "{:?}", p);
            assert!((FCARMIN..=FCARMAX).contains(&p.carrier_hz));
            assert!((FMODMIN..=FMODMAX).contains(&p.mod_hz));
        }
    }
}
