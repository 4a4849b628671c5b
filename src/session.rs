//! Session - transport, lifecycle and the parameter-mutation API
//!
//! A [`Session`] owns the parameter store, the selection/mute state and, once
//! started, the audio context with the five built generators.
//!
//! ```text
//! Uninitialized ──start──► Running ⇄ Suspended
//!        │                    │          │
//!        └──────close─────────┴──────────┴──► Closed
//! ```
//!
//! Parameter edits go to the store first and are then pushed into the running
//! generators by the [`Updater`]. Before `start` they only touch the store;
//! the generators are built from it.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::context::{Context, StreamState};
use crate::error::EngineError;
use crate::generator::{self, ControlValues, GraphHandle};
use crate::noise::NoiseBuffer;
use crate::params::{Field, GeneratorParameters, ParameterStore, SLOT_COUNT};
use crate::preset::Preset;
use crate::updater::Updater;

/// Which generator slots an edit applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetScope {
    Single(usize),
    All,
}

impl TargetScope {
    fn slots(self) -> std::ops::Range<usize> {
        match self {
            TargetScope::Single(slot) => slot..slot + 1,
            TargetScope::All => 0..SLOT_COUNT,
        }
    }
}

/// The slot edits are routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Slot(usize),
    /// Every edit is broadcast to all slots.
    MultiEdit,
}

/// Transport state shared by all update operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Silences every generator without touching its level.
    pub muted: bool,
    pub selection: Selection,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            muted: false,
            selection: Selection::Slot(0),
        }
    }
}

impl SessionState {
    pub fn scope(&self) -> TargetScope {
        match self.selection {
            Selection::Slot(slot) => TargetScope::Single(slot),
            Selection::MultiEdit => TargetScope::All,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Running,
    Suspended,
    Closed,
}

impl Lifecycle {
    pub fn name(self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Running => "running",
            Lifecycle::Suspended => "suspended",
            Lifecycle::Closed => "closed",
        }
    }
}

/// Non-error outcome of starting or resuming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advisory {
    Ready,
    /// The platform keeps the output suspended until the user interacts;
    /// call [`Session::resume`] from a user gesture.
    ResumeRequired,
}

struct Engine {
    context: Context,
    generators: Vec<GraphHandle>,
}

/// An entrainment session: five generators mixed to one stereo output.
pub struct Session {
    config: EngineConfig,
    params: ParameterStore,
    state: SessionState,
    /// Slot selected before multi-edit was switched on
    focused: usize,
    lifecycle: Lifecycle,
    engine: Option<Engine>,
    updater: Updater,
    rng: StdRng,
}

impl Session {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            updater: Updater::from_config(&config),
            config,
            params: ParameterStore::new(),
            state: SessionState::default(),
            focused: 0,
            lifecycle: Lifecycle::Uninitialized,
            engine: None,
            rng,
        })
    }

    /// Start on the default output device.
    #[cfg(feature = "cpal_sink")]
    pub fn start(&mut self) -> Result<Advisory, EngineError> {
        self.expect_uninitialized()?;
        let context = Context::default_output(&self.config)?;
        self.start_with(context)
    }

    /// Build every generator into `context` and start its output.
    pub fn start_with(&mut self, mut context: Context) -> Result<Advisory, EngineError> {
        self.expect_uninitialized()?;

        let sample_rate = context.sample_rate();
        let noise = NoiseBuffer::generate_with(
            sample_rate,
            self.config.noise_seconds,
            self.config.noise_scale,
            &mut self.rng,
        )?
        .shared();

        let generators: Vec<GraphHandle> = self
            .params
            .slots()
            .iter()
            .map(|params| generator::build(&mut context, params, &noise, self.state.muted, &self.config))
            .collect();

        tracing::info!(sample_rate, nodes = context.node_count(), "session started");

        let advisory = match context.resume() {
            StreamState::Playing => {
                self.lifecycle = Lifecycle::Running;
                Advisory::Ready
            }
            StreamState::Blocked => {
                tracing::info!("output blocked, session suspended until resumed");
                self.lifecycle = Lifecycle::Suspended;
                Advisory::ResumeRequired
            }
        };
        self.engine = Some(Engine { context, generators });
        Ok(advisory)
    }

    fn expect_uninitialized(&self) -> Result<(), EngineError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => Ok(()),
            Lifecycle::Closed => Err(EngineError::SessionClosed),
            other => Err(EngineError::InvalidTransition { from: other.name(), to: "running" }),
        }
    }

    fn expect_open(&self) -> Result<(), EngineError> {
        if self.lifecycle == Lifecycle::Closed {
            Err(EngineError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn resolve(&self, slot: Option<usize>) -> Result<TargetScope, EngineError> {
        match slot {
            Some(slot) if slot < SLOT_COUNT => Ok(TargetScope::Single(slot)),
            Some(slot) => Err(EngineError::InvalidSlot(slot)),
            None => Ok(self.state.scope()),
        }
    }

    /// Push the stored parameters of `slot` into its generator, if built.
    fn sync(&mut self, slot: usize) {
        if let Some(engine) = self.engine.as_mut() {
            let now = engine.context.current_frame();
            let params = self.params.slots()[slot];
            self.updater.apply(&mut engine.generators[slot], &params, self.state.muted, now);
        }
    }

    /// Set `field` to `value` on `slot`, or on the current selection when
    /// `slot` is `None`. Out-of-range values are clamped.
    pub fn set(&mut self, field: Field, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.expect_open()?;
        let scope = self.resolve(slot)?;
        for slot in scope.slots() {
            let params = self.params.get(slot)?.with(field, value);
            self.params.replace(slot, params)?;
            self.sync(slot);
        }
        Ok(())
    }

    pub fn set_carrier(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Carrier, value, slot)
    }

    pub fn set_mod(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Mod, value, slot)
    }

    pub fn set_isochronic(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Isochronic, value, slot)
    }

    pub fn set_binaural(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Binaural, value, slot)
    }

    pub fn set_bilateral(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Bilateral, value, slot)
    }

    pub fn set_fm(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Fm, value, slot)
    }

    pub fn set_noise(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Noise, value, slot)
    }

    pub fn set_level(&mut self, value: f32, slot: Option<usize>) -> Result<(), EngineError> {
        self.set(Field::Level, value, slot)
    }

    /// Flip the mute state and rewrite every generator's output gain.
    /// Returns the new mute state.
    pub fn toggle_mute(&mut self) -> Result<bool, EngineError> {
        self.expect_open()?;
        self.state.muted = !self.state.muted;
        for slot in 0..SLOT_COUNT {
            self.sync(slot);
        }
        tracing::info!(muted = self.state.muted, "mute toggled");
        Ok(self.state.muted)
    }

    /// Apply a named preset to the current selection.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), EngineError> {
        let scope = self.state.scope();
        self.apply_preset_to(name, scope)
    }

    /// Apply a named preset to `scope`. Each slot is sampled independently.
    pub fn apply_preset_to(&mut self, name: &str, scope: TargetScope) -> Result<(), EngineError> {
        self.expect_open()?;
        let preset: Preset = name.parse()?;
        if let TargetScope::Single(slot) = scope {
            if slot >= SLOT_COUNT {
                return Err(EngineError::InvalidSlot(slot));
            }
        }

        for slot in scope.slots() {
            let params = preset.apply(self.params.get(slot)?, &mut self.rng);
            self.params.replace(slot, params)?;
            self.sync(slot);
        }
        tracing::debug!(preset = preset.name(), ?scope, "preset applied");
        Ok(())
    }

    pub fn select_slot(&mut self, slot: usize) -> Result<(), EngineError> {
        self.expect_open()?;
        if slot >= SLOT_COUNT {
            return Err(EngineError::InvalidSlot(slot));
        }
        self.focused = slot;
        self.state.selection = Selection::Slot(slot);
        tracing::debug!(slot, "slot selected");
        Ok(())
    }

    /// Switch broadcasting of edits to all slots on or off. Switching it off
    /// returns to the previously selected slot.
    pub fn set_multi_edit(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.expect_open()?;
        self.state.selection = if enabled {
            Selection::MultiEdit
        } else {
            Selection::Slot(self.focused)
        };
        tracing::debug!(enabled, "multi-edit");
        Ok(())
    }

    /// Render one block, or while suspended apply queued control changes.
    ///
    /// Writes that an edit could not queue (a node's queue was full) are sent
    /// again once the block has drained the queues, so every generator
    /// converges on the store and the mute state.
    pub fn process(&mut self) -> Result<(), EngineError> {
        self.expect_open()?;
        if let Some(engine) = self.engine.as_mut() {
            engine.context.process();
        }
        self.resync();
        Ok(())
    }

    /// Rewrite every generator whose last written values lag behind the store.
    fn resync(&mut self) {
        let Some(engine) = self.engine.as_mut() else { return };
        let now = engine.context.current_frame();
        for (handle, params) in engine.generators.iter_mut().zip(self.params.slots().iter()) {
            if handle.values() != &ControlValues::compute(params, self.state.muted) {
                tracing::debug!("resending control writes dropped on a full queue");
                self.updater.apply(handle, params, self.state.muted, now);
            }
        }
    }

    pub fn suspend(&mut self) -> Result<(), EngineError> {
        match self.lifecycle {
            Lifecycle::Closed => Err(EngineError::SessionClosed),
            Lifecycle::Uninitialized => Err(EngineError::InvalidTransition { from: "uninitialized", to: "suspended" }),
            Lifecycle::Suspended => Ok(()),
            Lifecycle::Running => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.context.suspend();
                }
                self.lifecycle = Lifecycle::Suspended;
                tracing::info!("session suspended");
                Ok(())
            }
        }
    }

    pub fn resume(&mut self) -> Result<Advisory, EngineError> {
        match self.lifecycle {
            Lifecycle::Closed => Err(EngineError::SessionClosed),
            Lifecycle::Uninitialized => Err(EngineError::InvalidTransition { from: "uninitialized", to: "running" }),
            Lifecycle::Running => Ok(Advisory::Ready),
            Lifecycle::Suspended => {
                let stream = match self.engine.as_mut() {
                    Some(engine) => engine.context.resume(),
                    None => StreamState::Blocked,
                };
                match stream {
                    StreamState::Playing => {
                        self.lifecycle = Lifecycle::Running;
                        tracing::info!("session resumed");
                        Ok(Advisory::Ready)
                    }
                    StreamState::Blocked => Ok(Advisory::ResumeRequired),
                }
            }
        }
    }

    /// End the session, releasing the context and every generator node.
    pub fn close_session(&mut self) -> Result<(), EngineError> {
        self.expect_open()?;
        if let Some(engine) = self.engine.take() {
            engine.context.close();
        }
        self.lifecycle = Lifecycle::Closed;
        tracing::info!("session closed");
        Ok(())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parameters(&self, slot: usize) -> Result<GeneratorParameters, EngineError> {
        self.params.get(slot).map(|params| *params)
    }

    pub fn parameter_store(&self) -> &ParameterStore {
        &self.params
    }

    /// Control values of `slot`: the values last written into its generator,
    /// or the values it would be built with before the session starts.
    pub fn control_values(&self, slot: usize) -> Result<ControlValues, EngineError> {
        let params = self.params.get(slot)?;
        match self.engine.as_ref() {
            Some(engine) => Ok(*engine.generators[slot].values()),
            None => Ok(ControlValues::compute(params, self.state.muted)),
        }
    }

    /// Audio clock of the running context, in frames.
    pub fn current_frame(&self) -> Option<u64> {
        self.engine.as_ref().map(|engine| engine.context.current_frame())
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.engine.as_ref().map(|engine| engine.context.sample_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(EngineConfig::default().with_seed(5)).unwrap()
    }

    #[test]
    fn edits_before_start_only_touch_the_store() {
        let mut session = session();
        session.set_carrier(440.0, None).unwrap();
        assert_eq!(session.parameters(0).unwrap().carrier_hz, 440.0);
        assert_eq!(session.parameters(1).unwrap().carrier_hz, 220.0);
        assert_eq!(session.control_values(0).unwrap().filter_center_hz, 440.0);
        assert_eq!(session.current_frame(), None);
    }

    #[test]
    fn selection_routes_edits() {
        let mut session = session();
        session.select_slot(3).unwrap();
        session.set_noise(30.0, None).unwrap();
        assert_eq!(session.parameters(3).unwrap().noise_pct, 30.0);
        assert_eq!(session.parameters(0).unwrap().noise_pct, 0.0);

        session.set_multi_edit(true).unwrap();
        assert_eq!(session.state().scope(), TargetScope::All);
        session.set_multi_edit(false).unwrap();
        assert_eq!(session.state().selection, Selection::Slot(3));

        assert_eq!(session.select_slot(5), Err(EngineError::InvalidSlot(5)));
        assert_eq!(session.set_fm(10.0, Some(7)), Err(EngineError::InvalidSlot(7)));
    }

    #[test]
    fn lifecycle_transitions() {
        let mut session = session();
        assert!(matches!(session.suspend(), Err(EngineError::InvalidTransition { .. })));
        assert_eq!(session.start_with(Context::new(8_000)), Ok(Advisory::Ready));
        assert_eq!(session.lifecycle(), Lifecycle::Running);
        assert_eq!(
            session.start_with(Context::new(8_000)),
            Err(EngineError::InvalidTransition { from: "running", to: "running" })
        );

        session.suspend().unwrap();
        assert_eq!(session.lifecycle(), Lifecycle::Suspended);
        assert_eq!(session.resume(), Ok(Advisory::Ready));

        session.close_session().unwrap();
        assert_eq!(session.close_session(), Err(EngineError::SessionClosed));
        assert_eq!(session.process(), Err(EngineError::SessionClosed));
        assert_eq!(session.resume(), Err(EngineError::SessionClosed));
    }
}
