//! [`GateState`] – the single shared mutable state of the supervisor.
//!
//! Holds the last-known [`LimitState`] of both limit sensors and the
//! `initialized` flag.  Only the sensor cache and the startup sequencer
//! mutate it; everything else reads.

use gateguard_types::{Direction, LimitState};

/// Per-direction limit states plus the initialization flag.
///
/// Created as `(Unknown, Unknown, false)`.  Once a direction has received a
/// reading it never returns to [`LimitState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateState {
    limits: [LimitState; 2],
    resolved: [bool; 2],
    initialized: bool,
}

impl GateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(&self, direction: Direction) -> LimitState {
        self.limits[direction.index()]
    }

    /// `true` once both directions have produced their first reading.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether `direction` has produced its first reading.
    pub fn is_resolved(&self, direction: Direction) -> bool {
        self.resolved[direction.index()]
    }

    pub fn both_reached(&self) -> bool {
        self.limits.iter().all(|l| l.is_reached())
    }

    /// Store a new limit state and return the previous one.
    pub(crate) fn set_limit(&mut self, direction: Direction, state: LimitState) -> LimitState {
        std::mem::replace(&mut self.limits[direction.index()], state)
    }

    /// Mark `direction` resolved.  Returns `true` when this call completed
    /// the pair and flipped `initialized`.
    pub(crate) fn resolve(&mut self, direction: Direction) -> bool {
        self.resolved[direction.index()] = true;
        if !self.initialized && self.resolved.iter().all(|&r| r) {
            self.initialized = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_unknown_and_uninitialized() {
        let s = GateState::new();
        assert_eq!(s.limit(Direction::Open), LimitState::Unknown);
        assert_eq!(s.limit(Direction::Close), LimitState::Unknown);
        assert!(!s.is_initialized());
        assert!(!s.both_reached());
    }

    #[test]
    fn set_limit_returns_previous() {
        let mut s = GateState::new();
        assert_eq!(
            s.set_limit(Direction::Open, LimitState::Reached),
            LimitState::Unknown
        );
        assert_eq!(
            s.set_limit(Direction::Open, LimitState::NotReached),
            LimitState::Reached
        );
        assert_eq!(s.limit(Direction::Close), LimitState::Unknown);
    }

    #[test]
    fn initialized_flips_once_on_second_direction() {
        let mut s = GateState::new();
        assert!(!s.resolve(Direction::Close));
        assert!(!s.is_initialized());
        assert!(!s.resolve(Direction::Close));
        assert!(s.resolve(Direction::Open));
        assert!(s.is_initialized());
        // Already initialized: no second flip.
        assert!(!s.resolve(Direction::Open));
    }
}
