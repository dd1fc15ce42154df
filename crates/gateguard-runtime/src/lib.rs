//! `gateguard-runtime` – Event loop and telemetry
//!
//! Connects the synchronous safety kernel to an asynchronous host.
//!
//! # Modules
//!
//! - [`event_loop`] – [`GateRuntime`][event_loop::GateRuntime]: a single
//!   consumer that owns the kernel [`Pipeline`][gateguard_kernel::Pipeline],
//!   handles events strictly in arrival order, issues the resulting commands
//!   fire-and-forget and reports command failures as diagnostics.
//!   [`RuntimeHandle`][event_loop::RuntimeHandle] is the cloneable way in;
//!   [`pump_notifications`][event_loop::pump_notifications] routes raw host
//!   status notifications through a
//!   [`ChannelMap`][gateguard_hal::ChannelMap] into the loop.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod event_loop;
pub mod telemetry;

pub use event_loop::{pump_notifications, GateRuntime, RuntimeConfig, RuntimeHandle};
pub use telemetry::{init_tracing, LogFormat, TracerProviderGuard};
