//! Entrain - real-time brainwave-entrainment synthesis
//!
//! Five independently configurable tone generators, each a modulated carrier
//! tone plus carrier-coloured noise, mixed to one stereo output and adjustable
//! while playing.
//!
//! Design principles:
//! - Each context has a fixed sample rate (from device or explicit)
//! - Nodes receive control values via message ring buffers, not shared state
//! - No locks on the audio thread; the shared noise buffer is read-only
//! - Generators are built once per session and only re-parameterized
//! - CPAL output is a node plus a transport; any sink node works headless
//!
//! ```
//! use entrain::{Context, EngineConfig, RtrbSink, Session};
//!
//! let (producer, mut consumer) = rtrb::RingBuffer::new(4096);
//! let mut session = Session::new(EngineConfig::default().with_seed(1)).unwrap();
//! session.start_with(Context::new(48_000).with_output(RtrbSink::stereo(producer))).unwrap();
//! session.apply_preset("relax").unwrap();
//! session.process().unwrap();
//! assert_eq!(consumer.slots(), 128);
//! ```

mod config;
mod context;
mod error;
pub mod generator;
pub mod graph;
pub mod node;
pub mod noise;
pub mod nodes;
pub mod param;
pub mod params;
mod preset;
mod session;
pub mod sliders;
mod updater;

#[cfg(feature = "cpal_sink")]
mod device;

pub use config::{EngineConfig, FrequencySmoothing};
pub use context::{Context, ContextState, Handle, StreamState, StreamTransport};
pub use error::EngineError;
pub use generator::{ControlValues, GraphHandle};
pub use node::{AudioNode, NodeId, ProcessContext};
pub use noise::{NoiseBuffer, SharedNoise};
pub use nodes::RtrbSink;
pub use param::Automation;
pub use params::{Field, GeneratorParameters, ParameterStore, SLOT_COUNT};
pub use preset::Preset;
pub use session::{Advisory, Lifecycle, Selection, Session, SessionState, TargetScope};
pub use updater::Updater;

#[cfg(feature = "cpal_sink")]
pub use device::CpalDevice;
