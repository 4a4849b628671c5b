//! Audio source nodes (generators with no signal inputs)

mod noise;
mod sine;

pub use noise::NoisePlayer;
pub use sine::{Sine, SineMessage};
