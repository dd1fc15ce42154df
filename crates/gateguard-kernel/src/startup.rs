//! [`StartupSequencer`] – turns the two startup reads into known limit states.
//!
//! The runtime issues one asynchronous read per direction.  Each completion
//! is fed through [`StartupSequencer::on_read_result`]:
//!
//! - a successful read is applied exactly like a live sensor event, so the
//!   cutoff rule runs uniformly;
//! - a failed read is applied as [`LimitState::Reached`]: an unreadable
//!   sensor must never silently permit motion.
//!
//! A direction is *resolved* by its first reading, startup or live.  Once both
//! are resolved the state flips to initialized, and a pair of simultaneously
//! reached limits is reported as a wiring anomaly.  A startup result for a
//! direction that a live reading already resolved is stale and dropped.

use gateguard_types::{Diagnostic, Direction, GateError, LimitState, OutputCommand};

use crate::diagnostics::DiagnosticSink;
use crate::sensor_cache::SensorCache;
use crate::state::GateState;

#[derive(Debug, Default, Clone, Copy)]
pub struct StartupSequencer;

impl StartupSequencer {
    pub fn new() -> Self {
        Self
    }

    /// Apply the outcome of the startup read of `direction`.
    pub fn on_read_result(
        &self,
        cache: &SensorCache,
        state: &mut GateState,
        direction: Direction,
        result: &Result<bool, GateError>,
        sink: &dyn DiagnosticSink,
    ) -> Option<OutputCommand> {
        if state.is_resolved(direction) {
            sink.emit(Diagnostic::StaleStartupRead { direction });
            return None;
        }
        let cutoff = match result {
            Ok(raw) => cache.on_sensor_raw(state, direction, *raw, sink),
            Err(e) => {
                sink.emit(Diagnostic::StartupReadFailed {
                    direction,
                    error: e.to_string(),
                });
                cache.apply(state, direction, LimitState::Reached, sink)
            }
        };
        self.resolve(state, direction, sink);
        cutoff
    }

    /// Record that `direction` has a reading.  Returns `true` on the call
    /// that initializes the supervisor.
    pub fn resolve(
        &self,
        state: &mut GateState,
        direction: Direction,
        sink: &dyn DiagnosticSink,
    ) -> bool {
        if !state.resolve(direction) {
            return false;
        }
        sink.emit(Diagnostic::Initialized {
            open: state.limit(Direction::Open),
            close: state.limit(Direction::Close),
        });
        if state.both_reached() {
            sink.emit(Diagnostic::BothLimitsReached);
        }
        true
    }
}
