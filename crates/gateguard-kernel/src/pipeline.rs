//! [`Pipeline`] – one ordered handler chain per host event type.
//!
//! Owns the [`GateState`] and routes each [`HostEvent`] to the component
//! responsible for it:
//!
//! | Event | Handler |
//! |---|---|
//! | `SensorLevelChanged` | [`SensorCache`] update, then first-reading resolution |
//! | `StartupRead` | [`StartupSequencer`] |
//! | `OutputChanged` | [`InterlockSupervisor`], reading the post-update state |
//!
//! Events must be handed over strictly in arrival order, and the commands
//! returned for one event must be issued before the next event is handled.

use std::sync::Arc;

use gateguard_types::{HostEvent, OutputCommand, SensorPolarity};

use crate::diagnostics::DiagnosticSink;
use crate::interlock::InterlockSupervisor;
use crate::sensor_cache::SensorCache;
use crate::startup::StartupSequencer;
use crate::state::GateState;

pub struct Pipeline {
    state: GateState,
    cache: SensorCache,
    startup: StartupSequencer,
    supervisor: InterlockSupervisor,
    sink: Arc<dyn DiagnosticSink>,
}

impl Pipeline {
    pub fn new(
        open_polarity: SensorPolarity,
        close_polarity: SensorPolarity,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            state: GateState::new(),
            cache: SensorCache::new(open_polarity, close_polarity),
            startup: StartupSequencer::new(),
            supervisor: InterlockSupervisor::new(),
            sink,
        }
    }

    /// Handle one host event and return the commands it requires, in order.
    pub fn handle(&mut self, event: &HostEvent) -> Vec<OutputCommand> {
        let sink = self.sink.as_ref();
        match event {
            HostEvent::SensorLevelChanged { direction, raw } => {
                let cutoff = self
                    .cache
                    .on_sensor_raw(&mut self.state, *direction, *raw, sink);
                self.startup.resolve(&mut self.state, *direction, sink);
                cutoff.into_iter().collect()
            }
            HostEvent::StartupRead { direction, result } => self
                .startup
                .on_read_result(&self.cache, &mut self.state, *direction, result, sink)
                .into_iter()
                .collect(),
            HostEvent::OutputChanged { direction, on } => self
                .supervisor
                .on_output_changed(&self.cache, &self.state, *direction, *on, sink)
                .into_iter()
                .collect(),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn sensor_cache(&self) -> &SensorCache {
        &self.cache
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }
}
