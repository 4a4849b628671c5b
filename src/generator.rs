//! Generator graph builder.
//!
//! A generator turns one [`GeneratorParameters`] value into sound: a pair of
//! detuned carrier tones (binaural beat), a pair of noise bands centred on the
//! carrier, frequency modulation of both, a bilateral left/right amplitude
//! swing and an isochronic amplitude pulse, mixed to stereo and fed to the
//! context's master bus.
//!
//! ```text
//! lfo ──► fm ──────────► tone_l/r.freq        half_lfo ──► bil ──► pan_l.gain
//!     ├─► filt_fm ─────► band_l/r.centre                    └► bil_inv ► pan_r.gain
//!     └─► iso_d ───────► iso.gain
//! tone_l ► osc_l ─┐                  noise_l ► band_l ► nse_l ─┐
//!                 ├► pan_l ► merger.L ◄────────────────────────┘
//! (right side likewise into merger.R)
//! merger ► iso ► out ► master bus
//! ```

use crate::config::EngineConfig;
use crate::context::{Context, Handle};
use crate::noise::SharedNoise;
use crate::nodes::{BandPass, BandPassMessage, Gain, GainMessage, Merger, NoisePlayer, Sine, SineMessage};
use crate::params::{GeneratorParameters, FCARMAX};

/// Loudness compensation of the isochronic pulse, in `[0, 0.5]`.
///
/// Falls off towards high carriers, where a strong pulse sounds harsh.
pub fn isochronic_compensation(carrier_hz: f32) -> f32 {
    let c = carrier_hz / FCARMAX;
    0.5 * (1.0 - 0.5 * c) * (1.0 - 0.6 * c)
}

/// Every scalar control value of one generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlValues {
    pub tone_left_hz: f32,
    pub tone_right_hz: f32,
    /// Rate of the isochronic/FM oscillator.
    pub mod_hz: f32,
    /// Rate of the bilateral oscillator.
    pub half_mod_hz: f32,
    pub filter_center_hz: f32,
    /// Peak deviation of the tone frequencies.
    pub fm_depth_hz: f32,
    /// Peak deviation of the noise filter centres.
    pub filter_fm_depth_hz: f32,
    pub osc_gain: f32,
    pub noise_gain: f32,
    pub bilateral_depth: f32,
    pub pan_base: f32,
    /// `gainI`: depth of the isochronic pulse.
    pub isochronic_depth: f32,
    pub isochronic_base: f32,
    pub output_gain: f32,
}

impl ControlValues {
    pub fn compute(params: &GeneratorParameters, muted: bool) -> Self {
        let carrier = params.carrier_hz;
        let detune = params.mod_hz / 2.0 * params.binaural_pct / 100.0;
        let fm = params.fm_pct / 100.0;
        let noise = params.noise_pct / 100.0;
        let bilateral = params.bilateral_pct / 200.0;
        let isochronic = params.isochronic_pct / 100.0 * isochronic_compensation(carrier);

        Self {
            tone_left_hz: carrier - detune,
            tone_right_hz: carrier + detune,
            mod_hz: params.mod_hz,
            half_mod_hz: params.mod_hz / 2.0,
            filter_center_hz: carrier,
            fm_depth_hz: fm * carrier,
            filter_fm_depth_hz: params.fm_pct / 150.0 * carrier,
            osc_gain: 1.0 - noise,
            noise_gain: noise,
            bilateral_depth: bilateral,
            pan_base: 1.0 - bilateral,
            isochronic_depth: isochronic,
            isochronic_base: 1.0 - isochronic,
            output_gain: if muted { 0.0 } else { params.level_pct * params.level_pct / 10_000.0 },
        }
    }
}

/// Control handles of one built generator.
///
/// The nodes themselves are owned by the context's graph and live until the
/// context is closed; the handle only writes control values into them.
pub struct GraphHandle {
    pub(crate) lfo: Handle<SineMessage>,
    pub(crate) half_lfo: Handle<SineMessage>,
    pub(crate) fm: Handle<GainMessage>,
    pub(crate) filter_fm: Handle<GainMessage>,
    pub(crate) tone_left: Handle<SineMessage>,
    pub(crate) tone_right: Handle<SineMessage>,
    pub(crate) band_left: Handle<BandPassMessage>,
    pub(crate) band_right: Handle<BandPassMessage>,
    pub(crate) osc_left: Handle<GainMessage>,
    pub(crate) osc_right: Handle<GainMessage>,
    pub(crate) noise_left: Handle<GainMessage>,
    pub(crate) noise_right: Handle<GainMessage>,
    pub(crate) bilateral: Handle<GainMessage>,
    pub(crate) pan_left: Handle<GainMessage>,
    pub(crate) pan_right: Handle<GainMessage>,
    pub(crate) isochronic_depth: Handle<GainMessage>,
    pub(crate) isochronic: Handle<GainMessage>,
    pub(crate) output: Handle<GainMessage>,
    pub(crate) values: ControlValues,
}

impl GraphHandle {
    /// The control values last written into the graph.
    pub fn values(&self) -> &ControlValues {
        &self.values
    }
}

/// Build one generator into `context` and connect it to the master bus.
pub fn build(
    context: &mut Context,
    params: &GeneratorParameters,
    noise: &SharedNoise,
    muted: bool,
    config: &EngineConfig,
) -> GraphHandle {
    let v = ControlValues::compute(params, muted);

    // Modulators
    let lfo = context.add(Sine::new(v.mod_hz));
    let half_lfo = context.add(Sine::new(v.half_mod_hz));
    let fm = context.add(Gain::new(v.fm_depth_hz));
    let filter_fm = context.add(Gain::new(v.filter_fm_depth_hz));
    context.connect(&lfo, &fm);
    context.connect(&lfo, &filter_fm);

    // Binaural tone pair
    let tone_left = context.add(Sine::new(v.tone_left_hz));
    let tone_right = context.add(Sine::new(v.tone_right_hz));
    context.connect_param(&fm, &tone_left, 0);
    context.connect_param(&fm, &tone_right, 0);

    // Noise bands, read half a buffer apart so the ears get different noise
    let noise_left = context.add(NoisePlayer::new(noise.clone()));
    let noise_right = context.add(NoisePlayer::new(noise.clone()).with_offset(noise.len() / 2));
    let band_left = context.add(BandPass::new(v.filter_center_hz, config.filter_q));
    let band_right = context.add(BandPass::new(v.filter_center_hz, config.filter_q));
    context.connect(&noise_left, &band_left);
    context.connect(&noise_right, &band_right);
    context.connect_param(&filter_fm, &band_left, 0);
    context.connect_param(&filter_fm, &band_right, 0);

    // Tone/noise mix
    let osc_left = context.add(Gain::new(v.osc_gain));
    let osc_right = context.add(Gain::new(v.osc_gain));
    let noise_gain_left = context.add(Gain::new(v.noise_gain));
    let noise_gain_right = context.add(Gain::new(v.noise_gain));
    context.connect(&tone_left, &osc_left);
    context.connect(&tone_right, &osc_right);
    context.connect(&band_left, &noise_gain_left);
    context.connect(&band_right, &noise_gain_right);

    // Bilateral swing: right channel moves against the left
    let bilateral = context.add(Gain::new(v.bilateral_depth));
    let bilateral_inv = context.add(Gain::new(-1.0));
    context.connect(&half_lfo, &bilateral);
    context.connect(&bilateral, &bilateral_inv);
    let pan_left = context.add(Gain::new(v.pan_base));
    let pan_right = context.add(Gain::new(v.pan_base));
    context.connect(&osc_left, &pan_left);
    context.connect(&noise_gain_left, &pan_left);
    context.connect(&osc_right, &pan_right);
    context.connect(&noise_gain_right, &pan_right);
    context.connect_param(&bilateral, &pan_left, 0);
    context.connect_param(&bilateral_inv, &pan_right, 0);

    let merger = context.add(Merger::stereo());
    context.connect_channel(&pan_left, &merger, 0);
    context.connect_channel(&pan_right, &merger, 1);

    // Isochronic pulse
    let isochronic_depth = context.add(Gain::new(v.isochronic_depth));
    let isochronic = context.add(Gain::stereo(v.isochronic_base));
    context.connect(&lfo, &isochronic_depth);
    context.connect(&merger, &isochronic);
    context.connect_param(&isochronic_depth, &isochronic, 0);

    let output = context.add(Gain::stereo(v.output_gain));
    context.connect(&isochronic, &output);
    context.output(&output);

    tracing::trace!(?v, "generator built");

    GraphHandle {
        lfo,
        half_lfo,
        fm,
        filter_fm,
        tone_left,
        tone_right,
        band_left,
        band_right,
        osc_left,
        osc_right,
        noise_left: noise_gain_left,
        noise_right: noise_gain_right,
        bilateral,
        pan_left,
        pan_right,
        isochronic_depth,
        isochronic,
        output,
        values: v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::NoiseBuffer;
    use crate::nodes::RtrbSink;
    use crate::params::{Field, FCARMIN};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn isochronic_gain_is_bounded_and_non_increasing() {
        let mut previous = f32::INFINITY;
        let mut carrier = FCARMIN;
        while carrier <= FCARMAX {
            let params = GeneratorParameters::default()
                .with(Field::Carrier, carrier)
                .with(Field::Isochronic, 100.0);
            let gain = ControlValues::compute(&params, false).isochronic_depth;
            assert!((0.0..=0.5).contains(&gain), "gainI {} at {} Hz", gain, carrier);
            assert!(gain <= previous);
            previous = gain;
            carrier *= 1.01;
        }
    }

    #[test]
    fn control_values_follow_the_parameters() {
        let params = GeneratorParameters {
            carrier_hz: 200.0,
            mod_hz: 10.0,
            isochronic_pct: 0.0,
            binaural_pct: 100.0,
            bilateral_pct: 50.0,
            fm_pct: 30.0,
            noise_pct: 25.0,
            level_pct: 60.0,
        };
        let v = ControlValues::compute(&params, false);
        assert_eq!((v.tone_left_hz, v.tone_right_hz), (195.0, 205.0));
        assert_eq!(v.half_mod_hz, 5.0);
        assert!((v.fm_depth_hz - 60.0).abs() < 1e-4);
        assert!((v.filter_fm_depth_hz - 40.0).abs() < 1e-4);
        assert_eq!((v.osc_gain, v.noise_gain), (0.75, 0.25));
        assert_eq!((v.pan_base, v.bilateral_depth), (0.75, 0.25));
        assert_eq!((v.isochronic_depth, v.isochronic_base), (0.0, 1.0));
        assert_eq!(v.output_gain, 0.36);

        assert_eq!(ControlValues::compute(&params, true).output_gain, 0.0);
    }

    #[test]
    fn built_generator_renders_bounded_stereo() {
        let (producer, mut consumer) = rtrb::RingBuffer::new(64 * 2 * 100);
        let mut context = Context::new(48_000).with_output(RtrbSink::stereo(producer));
        let noise = NoiseBuffer::generate(48_000, &mut StdRng::seed_from_u64(9)).unwrap().shared();
        let params = GeneratorParameters {
            noise_pct: 50.0,
            bilateral_pct: 100.0,
            fm_pct: 20.0,
            level_pct: 100.0,
            ..GeneratorParameters::default()
        };
        let before = context.node_count();
        let handle = build(&mut context, &params, &noise, false, &EngineConfig::default());
        assert_eq!(context.node_count() - before, 22);
        assert_eq!(handle.values(), &ControlValues::compute(&params, false));

        context.resume();
        for _ in 0..100 {
            context.process();
        }
        let samples: Vec<f32> = std::iter::from_fn(|| consumer.pop().ok()).collect();
        assert_eq!(samples.len(), 64 * 2 * 100);
        assert!(samples.iter().all(|s| s.is_finite()));
        let left_energy: f32 = samples.iter().step_by(2).map(|s| s * s).sum();
        let right_energy: f32 = samples.iter().skip(1).step_by(2).map(|s| s * s).sum();
        assert!(left_energy > 0.0 && right_energy > 0.0);
    }
}
