//! Audio effect nodes (processors with audio inputs and outputs)

mod band_pass;
mod gain;
mod merger;
mod mixer;

pub use band_pass::{BandPass, BandPassMessage};
pub use gain::{Gain, GainMessage};
pub use merger::Merger;
pub use mixer::Mixer;
