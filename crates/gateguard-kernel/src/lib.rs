//! `gateguard-kernel` – Safety interlock core
//!
//! Guarantees, for a two-output gate actuator, that the OPEN and CLOSE
//! outputs are never energised together and that no output stays energised
//! while its own limit sensor reports "reached".  The kernel is synchronous
//! and side-effect free: every handler returns the
//! [`OutputCommand`][gateguard_types::OutputCommand]s to issue and reports
//! what it did to a [`DiagnosticSink`].
//!
//! # Modules
//!
//! - [`state`] – [`GateState`]: the limit-state pair and `initialized` flag.
//! - [`sensor_cache`] – [`SensorCache`]: polarity translation and the
//!   unconditional cutoff on a reached limit.
//! - [`startup`] – [`StartupSequencer`]: initial reads, the fail-safe default
//!   for unreadable sensors, and the both-limits anomaly.
//! - [`interlock`] – [`InterlockSupervisor`]: limit block and mutual
//!   exclusion on output activation.
//! - [`pipeline`] – [`Pipeline`]: the ordered per-event handler chain that
//!   owns the state.
//! - [`diagnostics`] – [`DiagnosticSink`] and its stock implementations.

pub mod diagnostics;
pub mod interlock;
pub mod pipeline;
pub mod sensor_cache;
pub mod startup;
pub mod state;

pub use diagnostics::{DiagnosticSink, FanoutSink, MemorySink, NullSink, TracingSink};
pub use interlock::{
    InterlockRule, InterlockSupervisor, LimitBlockRule, MutualExclusionRule, Verdict,
};
pub use pipeline::Pipeline;
pub use sensor_cache::SensorCache;
pub use startup::StartupSequencer;
pub use state::GateState;
