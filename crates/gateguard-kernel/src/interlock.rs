//! [`InterlockSupervisor`] – reacts to output activations.
//!
//! Evaluated only for activations (`on = true`) and only once the limit
//! states are initialized.  Two rules run in order; the first that overrides
//! wins:
//!
//! 1. [`LimitBlockRule`] – an output whose limit is reached is switched
//!    straight back off, and nothing else is commanded.
//! 2. [`MutualExclusionRule`] – otherwise the opposite output is forced off,
//!    even if it already is off.
//!
//! The supervisor is a pure reaction.  It never starts motion, times travel,
//! or tracks whether the gate is moving.

use gateguard_types::{Diagnostic, Direction, OutputCommand};
use tracing::trace;

use crate::diagnostics::DiagnosticSink;
use crate::sensor_cache::SensorCache;
use crate::state::GateState;

/// Outcome of one [`InterlockRule`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The rule has nothing to say; evaluate the next one.
    Pass,
    /// Issue `command` and stop evaluating.
    Override {
        command: OutputCommand,
        diagnostic: Diagnostic,
    },
}

/// A single interlock rule evaluated on activation of `activated`.
pub trait InterlockRule: Send + Sync {
    /// Name used in traces.
    fn name(&self) -> &str;

    fn evaluate(&self, cache: &SensorCache, state: &GateState, activated: Direction) -> Verdict;
}

/// Reverses an activation whose own limit is reached.
pub struct LimitBlockRule;

impl InterlockRule for LimitBlockRule {
    fn name(&self) -> &str {
        "limit_block"
    }

    fn evaluate(&self, cache: &SensorCache, state: &GateState, activated: Direction) -> Verdict {
        if cache.read(state, activated).is_reached() {
            Verdict::Override {
                command: OutputCommand::off(activated),
                diagnostic: Diagnostic::ActivationBlocked {
                    direction: activated,
                },
            }
        } else {
            Verdict::Pass
        }
    }
}

/// Forces the opposite output off.
pub struct MutualExclusionRule;

impl InterlockRule for MutualExclusionRule {
    fn name(&self) -> &str {
        "mutual_exclusion"
    }

    fn evaluate(&self, _cache: &SensorCache, _state: &GateState, activated: Direction) -> Verdict {
        let forced_off = activated.opposite();
        Verdict::Override {
            command: OutputCommand::off(forced_off),
            diagnostic: Diagnostic::Interlock {
                activated,
                forced_off,
            },
        }
    }
}

/// Stateless activation handler with a fixed rule order.
pub struct InterlockSupervisor {
    rules: Vec<Box<dyn InterlockRule>>,
}

impl Default for InterlockSupervisor {
    fn default() -> Self {
        Self {
            rules: vec![Box::new(LimitBlockRule), Box::new(MutualExclusionRule)],
        }
    }
}

impl InterlockSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to an observed change of the energised state of `direction`.
    pub fn on_output_changed(
        &self,
        cache: &SensorCache,
        state: &GateState,
        direction: Direction,
        powered_on: bool,
        sink: &dyn DiagnosticSink,
    ) -> Option<OutputCommand> {
        if !powered_on {
            return None;
        }
        if !state.is_initialized() {
            sink.emit(Diagnostic::IgnoredBeforeInit { direction });
            return None;
        }
        for rule in &self.rules {
            if let Verdict::Override {
                command,
                diagnostic,
            } = rule.evaluate(cache, state, direction)
            {
                trace!(rule = rule.name(), %command, "interlock override");
                sink.emit(diagnostic);
                return Some(command);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MemorySink, NullSink};
    use crate::startup::StartupSequencer;

    /// Initialized state with the given raw levels (active-high).
    fn initialized(open_raw: bool, close_raw: bool) -> (SensorCache, GateState) {
        let cache = SensorCache::default();
        let mut state = GateState::new();
        let seq = StartupSequencer::new();
        seq.on_read_result(&cache, &mut state, Direction::Open, &Ok(open_raw), &NullSink);
        seq.on_read_result(&cache, &mut state, Direction::Close, &Ok(close_raw), &NullSink);
        assert!(state.is_initialized());
        (cache, state)
    }

    #[test]
    fn activation_forces_opposite_off() {
        let (cache, state) = initialized(false, false);
        let sup = InterlockSupervisor::new();

        for d in Direction::ALL {
            assert_eq!(
                sup.on_output_changed(&cache, &state, d, true, &NullSink),
                Some(OutputCommand::off(d.opposite()))
            );
        }
    }

    #[test]
    fn activation_with_reached_limit_is_reversed_only() {
        let (cache, state) = initialized(true, false);
        let sup = InterlockSupervisor::new();
        let sink = MemorySink::new();

        let cmd = sup.on_output_changed(&cache, &state, Direction::Open, true, &sink);
        assert_eq!(cmd, Some(OutputCommand::off(Direction::Open)));
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::ActivationBlocked {
                direction: Direction::Open
            }]
        );
    }

    #[test]
    fn opposite_limit_does_not_block() {
        // CLOSE limit reached, OPEN activation is legitimate.
        let (cache, state) = initialized(false, true);
        let sup = InterlockSupervisor::new();
        assert_eq!(
            sup.on_output_changed(&cache, &state, Direction::Open, true, &NullSink),
            Some(OutputCommand::off(Direction::Close))
        );
    }

    #[test]
    fn deactivation_is_ignored() {
        let (cache, state) = initialized(true, true);
        let sup = InterlockSupervisor::new();
        for d in Direction::ALL {
            assert_eq!(sup.on_output_changed(&cache, &state, d, false, &NullSink), None);
        }
    }

    #[test]
    fn events_before_initialization_are_inert() {
        let cache = SensorCache::default();
        let mut state = GateState::new();
        let sup = InterlockSupervisor::new();
        let sink = MemorySink::new();

        assert_eq!(
            sup.on_output_changed(&cache, &state, Direction::Open, true, &sink),
            None
        );

        // Half-initialized is still inert, even with the limit reached.
        StartupSequencer::new().on_read_result(
            &cache,
            &mut state,
            Direction::Open,
            &Ok(true),
            &NullSink,
        );
        assert_eq!(
            sup.on_output_changed(&cache, &state, Direction::Open, true, &sink),
            None
        );
        assert_eq!(
            sink.diagnostics(),
            vec![
                Diagnostic::IgnoredBeforeInit {
                    direction: Direction::Open
                };
                2
            ]
        );
    }

    #[test]
    fn repeated_activation_reissues_same_command() {
        let (cache, state) = initialized(false, false);
        let sup = InterlockSupervisor::new();
        let first = sup.on_output_changed(&cache, &state, Direction::Close, true, &NullSink);
        let second = sup.on_output_changed(&cache, &state, Direction::Close, true, &NullSink);
        assert_eq!(first, second);
    }

    #[test]
    fn rules_are_named() {
        assert_eq!(LimitBlockRule.name(), "limit_block");
        assert_eq!(MutualExclusionRule.name(), "mutual_exclusion");
    }
}
