//! Live parameter updater.
//!
//! Rewrites the control values of an already built generator. Nothing is
//! rebuilt: each changed value becomes one message to the node that owns it.

use crate::config::{EngineConfig, FrequencySmoothing};
use crate::context::Handle;
use crate::generator::{ControlValues, GraphHandle};
use crate::nodes::{BandPassMessage, GainMessage, SineMessage};
use crate::param::Automation;
use crate::params::GeneratorParameters;

/// Pushes parameter changes into running generators.
#[derive(Clone, Copy, Debug)]
pub struct Updater {
    smoothing: FrequencySmoothing,
    time_constant: f32,
}

impl Updater {
    pub fn new(smoothing: FrequencySmoothing, time_constant: f32) -> Self {
        Self { smoothing, time_constant }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.smoothing, config.ramp_time_constant)
    }

    /// Recompute the control values of `handle` from `params` and write the
    /// ones that changed.
    ///
    /// Ramped frequencies start at `now_frame` on the audio clock. A value
    /// whose message could not be queued keeps its previous entry in
    /// [`GraphHandle::values`] and is written again on the next call.
    pub fn apply(&self, handle: &mut GraphHandle, params: &GeneratorParameters, muted: bool, now_frame: u64) {
        let new = ControlValues::compute(params, muted);
        let old = handle.values;
        let mut written = old;

        let ramp_all = self.smoothing == FrequencySmoothing::AllFrequencies;

        // Modulation-rate oscillators are always ramped
        if new.mod_hz != old.mod_hz
            && send(&mut handle.lfo, SineMessage::Frequency(self.frequency(new.mod_hz, true, now_frame)), "lfo")
        {
            written.mod_hz = new.mod_hz;
        }
        if new.half_mod_hz != old.half_mod_hz
            && send(
                &mut handle.half_lfo,
                SineMessage::Frequency(self.frequency(new.half_mod_hz, true, now_frame)),
                "half_lfo",
            )
        {
            written.half_mod_hz = new.half_mod_hz;
        }

        if new.tone_left_hz != old.tone_left_hz
            && send(
                &mut handle.tone_left,
                SineMessage::Frequency(self.frequency(new.tone_left_hz, ramp_all, now_frame)),
                "tone_left",
            )
        {
            written.tone_left_hz = new.tone_left_hz;
        }
        if new.tone_right_hz != old.tone_right_hz
            && send(
                &mut handle.tone_right,
                SineMessage::Frequency(self.frequency(new.tone_right_hz, ramp_all, now_frame)),
                "tone_right",
            )
        {
            written.tone_right_hz = new.tone_right_hz;
        }
        if new.filter_center_hz != old.filter_center_hz {
            let center = BandPassMessage::Center(self.frequency(new.filter_center_hz, ramp_all, now_frame));
            let left = send(&mut handle.band_left, center, "band_left");
            let right = send(&mut handle.band_right, center, "band_right");
            if left && right {
                written.filter_center_hz = new.filter_center_hz;
            }
        }

        set_gain(&mut handle.fm, new.fm_depth_hz, old.fm_depth_hz, &mut written.fm_depth_hz, "fm");
        set_gain(
            &mut handle.filter_fm,
            new.filter_fm_depth_hz,
            old.filter_fm_depth_hz,
            &mut written.filter_fm_depth_hz,
            "filter_fm",
        );
        set_gain_pair(
            [&mut handle.osc_left, &mut handle.osc_right],
            new.osc_gain,
            old.osc_gain,
            &mut written.osc_gain,
            "osc",
        );
        set_gain_pair(
            [&mut handle.noise_left, &mut handle.noise_right],
            new.noise_gain,
            old.noise_gain,
            &mut written.noise_gain,
            "noise",
        );
        set_gain(
            &mut handle.bilateral,
            new.bilateral_depth,
            old.bilateral_depth,
            &mut written.bilateral_depth,
            "bilateral",
        );
        set_gain_pair(
            [&mut handle.pan_left, &mut handle.pan_right],
            new.pan_base,
            old.pan_base,
            &mut written.pan_base,
            "pan",
        );
        set_gain(
            &mut handle.isochronic_depth,
            new.isochronic_depth,
            old.isochronic_depth,
            &mut written.isochronic_depth,
            "isochronic_depth",
        );
        set_gain(
            &mut handle.isochronic,
            new.isochronic_base,
            old.isochronic_base,
            &mut written.isochronic_base,
            "isochronic",
        );
        set_gain(&mut handle.output, new.output_gain, old.output_gain, &mut written.output_gain, "output");

        handle.values = written;
    }

    fn frequency(&self, hz: f32, ramp: bool, now_frame: u64) -> Automation {
        if ramp && self.time_constant > 0.0 {
            Automation::TargetAt {
                target: hz,
                start_frame: now_frame,
                time_constant: self.time_constant,
            }
        } else {
            Automation::Set(hz)
        }
    }
}

fn send<M: Send + core::fmt::Debug + 'static>(handle: &mut Handle<M>, msg: M, control: &'static str) -> bool {
    tracing::trace!(control, ?msg, "control write");
    match handle.send(msg) {
        Ok(()) => true,
        Err(msg) => {
            tracing::warn!(control, ?msg, "control queue full, write dropped");
            false
        }
    }
}

fn set_gain(handle: &mut Handle<GainMessage>, new: f32, old: f32, written: &mut f32, control: &'static str) {
    if new != old && send(handle, GainMessage::Gain(Automation::Set(new)), control) {
        *written = new;
    }
}

fn set_gain_pair(
    handles: [&mut Handle<GainMessage>; 2],
    new: f32,
    old: f32,
    written: &mut f32,
    control: &'static str,
) {
    if new == old {
        return;
    }
    let mut delivered = true;
    for handle in handles {
        delivered &= send(handle, GainMessage::Gain(Automation::Set(new)), control);
    }
    if delivered {
        *written = new;
    }
}
