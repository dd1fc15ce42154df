//! `gateguard-hal` – Host collaborator seam
//!
//! The safety core never talks to a device directly.  It hands
//! [`OutputCommand`][gateguard_types::OutputCommand]s and read requests to
//! whatever implements the traits in this crate.
//!
//! # Modules
//!
//! - [`host`] – [`OutputDriver`][host::OutputDriver] and
//!   [`SensorReader`][host::SensorReader]: the asynchronous, fallible command
//!   primitives offered by the host.
//! - [`channel_map`] – [`ChannelMap`][channel_map::ChannelMap]: binds each
//!   [`Direction`][gateguard_types::Direction] to a physical switch and input
//!   channel and routes raw host status notifications into
//!   [`HostEvent`][gateguard_types::HostEvent]s.
//! - [`sim`] – [`SimHost`][sim::SimHost]: an in-process host with injectable
//!   failures and read latency, for tests and the interactive console.

pub mod channel_map;
pub mod host;
pub mod sim;

pub use channel_map::{ChannelMap, ComponentId, StatusDelta, StatusNotification};
pub use host::{OutputDriver, SensorReader};
pub use sim::SimHost;
