//! [`SensorCache`] – last-known logical state of both limit sensors.
//!
//! Raw host levels are translated through each direction's
//! [`SensorPolarity`].  Whenever a limit is (or still is) reached the cache
//! returns an unconditional cutoff for that direction's output, independent of
//! the interlock supervisor: the travel extreme has physically been reached
//! whatever is currently driving the output.
//!
//! # Example
//!
//! ```
//! use gateguard_kernel::{GateState, NullSink, SensorCache};
//! use gateguard_types::{Direction, LimitState, OutputCommand, SensorPolarity};
//!
//! let cache = SensorCache::new(SensorPolarity::ActiveLow, SensorPolarity::ActiveHigh);
//! let mut state = GateState::new();
//!
//! // Normally-closed OPEN limit: a low level means "reached".
//! let cmd = cache.on_sensor_raw(&mut state, Direction::Open, false, &NullSink);
//! assert_eq!(cmd, Some(OutputCommand::off(Direction::Open)));
//! assert_eq!(cache.read(&state, Direction::Open), LimitState::Reached);
//! ```

use gateguard_types::{Diagnostic, Direction, LimitState, OutputCommand, SensorPolarity};

use crate::diagnostics::DiagnosticSink;
use crate::state::GateState;

/// Polarity-aware translator from raw levels to [`LimitState`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorCache {
    polarity: [SensorPolarity; 2],
}

impl SensorCache {
    pub fn new(open: SensorPolarity, close: SensorPolarity) -> Self {
        Self {
            polarity: [open, close],
        }
    }

    pub fn polarity(&self, direction: Direction) -> SensorPolarity {
        self.polarity[direction.index()]
    }

    /// Current logical state of the limit sensor of `direction`.
    pub fn read(&self, state: &GateState, direction: Direction) -> LimitState {
        state.limit(direction)
    }

    /// Apply a raw level for `direction`.
    ///
    /// Returns the cutoff command when the limit is reached.  A repeated
    /// reached level re-issues the cutoff, since the output may have been
    /// re-energised externally in between, but reports no transition.
    pub fn on_sensor_raw(
        &self,
        state: &mut GateState,
        direction: Direction,
        raw: bool,
        sink: &dyn DiagnosticSink,
    ) -> Option<OutputCommand> {
        let active = self.polarity(direction).is_active(raw);
        self.apply(state, direction, LimitState::from_active(active), sink)
    }

    /// Store an already-interpreted state, with the same transition report
    /// and cutoff rule as a live reading.
    pub(crate) fn apply(
        &self,
        state: &mut GateState,
        direction: Direction,
        next: LimitState,
        sink: &dyn DiagnosticSink,
    ) -> Option<OutputCommand> {
        let previous = state.set_limit(direction, next);
        if previous != next {
            sink.emit(Diagnostic::LimitChanged {
                direction,
                from: previous,
                to: next,
            });
        }
        if next.is_reached() {
            sink.emit(Diagnostic::LimitCutoff { direction });
            return Some(OutputCommand::off(direction));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;

    fn transitions(sink: &MemorySink) -> usize {
        sink.diagnostics()
            .iter()
            .filter(|d| matches!(d, Diagnostic::LimitChanged { .. }))
            .count()
    }

    #[test]
    fn active_high_reached_on_true() {
        let cache = SensorCache::new(SensorPolarity::ActiveHigh, SensorPolarity::ActiveHigh);
        let mut state = GateState::new();
        let sink = MemorySink::new();

        let cmd = cache.on_sensor_raw(&mut state, Direction::Close, true, &sink);
        assert_eq!(cmd, Some(OutputCommand::off(Direction::Close)));
        assert_eq!(state.limit(Direction::Close), LimitState::Reached);

        let cmd = cache.on_sensor_raw(&mut state, Direction::Close, false, &sink);
        assert_eq!(cmd, None);
        assert_eq!(state.limit(Direction::Close), LimitState::NotReached);
    }

    #[test]
    fn active_low_reached_on_false() {
        let cache = SensorCache::new(SensorPolarity::ActiveLow, SensorPolarity::ActiveLow);
        let mut state = GateState::new();
        let sink = MemorySink::new();

        assert_eq!(
            cache.on_sensor_raw(&mut state, Direction::Open, false, &sink),
            Some(OutputCommand::off(Direction::Open))
        );
        assert_eq!(state.limit(Direction::Open), LimitState::Reached);

        assert_eq!(cache.on_sensor_raw(&mut state, Direction::Open, true, &sink), None);
        assert_eq!(state.limit(Direction::Open), LimitState::NotReached);
    }

    #[test]
    fn polarity_is_independent_per_direction() {
        let cache = SensorCache::new(SensorPolarity::ActiveLow, SensorPolarity::ActiveHigh);
        let mut state = GateState::new();

        cache.on_sensor_raw(&mut state, Direction::Open, true, &MemorySink::new());
        cache.on_sensor_raw(&mut state, Direction::Close, true, &MemorySink::new());
        assert_eq!(state.limit(Direction::Open), LimitState::NotReached);
        assert_eq!(state.limit(Direction::Close), LimitState::Reached);
    }

    #[test]
    fn first_reading_reports_transition_from_unknown() {
        let cache = SensorCache::default();
        let mut state = GateState::new();
        let sink = MemorySink::new();

        cache.on_sensor_raw(&mut state, Direction::Open, false, &sink);
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::LimitChanged {
                direction: Direction::Open,
                from: LimitState::Unknown,
                to: LimitState::NotReached,
            }]
        );
    }

    #[test]
    fn repeated_reached_reissues_cutoff_without_transition() {
        let cache = SensorCache::default();
        let mut state = GateState::new();
        let sink = MemorySink::new();

        let first = cache.on_sensor_raw(&mut state, Direction::Open, true, &sink);
        let second = cache.on_sensor_raw(&mut state, Direction::Open, true, &sink);
        let third = cache.on_sensor_raw(&mut state, Direction::Open, true, &sink);

        assert_eq!(first, Some(OutputCommand::off(Direction::Open)));
        assert_eq!(second, first);
        assert_eq!(third, first);
        assert_eq!(transitions(&sink), 1);
    }

    #[test]
    fn repeated_not_reached_is_silent() {
        let cache = SensorCache::default();
        let mut state = GateState::new();
        let sink = MemorySink::new();

        cache.on_sensor_raw(&mut state, Direction::Close, false, &sink);
        assert_eq!(cache.on_sensor_raw(&mut state, Direction::Close, false, &sink), None);
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn limit_cycles_freely_after_first_reading() {
        let cache = SensorCache::default();
        let mut state = GateState::new();
        let sink = MemorySink::new();

        for raw in [true, false, true, false, true] {
            cache.on_sensor_raw(&mut state, Direction::Open, raw, &sink);
            assert_ne!(state.limit(Direction::Open), LimitState::Unknown);
        }
        assert_eq!(state.limit(Direction::Open), LimitState::Reached);
        assert_eq!(transitions(&sink), 5);
    }
}
