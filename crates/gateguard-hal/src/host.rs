//! Asynchronous command primitives offered by the host runtime.
//!
//! Every call may fail with an opaque [`GateError`]; callers only log it.

use async_trait::async_trait;
use gateguard_types::{Direction, GateError, InputMode};

/// The two power outputs of the actuator.
///
/// Host drivers implement this trait; the runtime only ever talks to the
/// trait, so a device backend can be swapped without touching the interlock.
#[async_trait]
pub trait OutputDriver: Send + Sync {
    /// Energise (`on = true`) or de-energise the output of `direction`.
    ///
    /// Implementations must be idempotent: switching an output that is
    /// already off to off is a valid, successful command.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::OutputFailed`] if the host rejects the command.
    async fn set_output(&self, direction: Direction, on: bool) -> Result<(), GateError>;

    /// One-shot configuration of how the host couples the physical input of
    /// `direction` to its local relay logic.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ModeConfigFailed`] if the host rejects the mode.
    async fn set_input_mode(&self, direction: Direction, mode: InputMode) -> Result<(), GateError>;
}

/// Startup access to the limit sensors' current raw level.
#[async_trait]
pub trait SensorReader: Send + Sync {
    /// Read the raw level of the limit input of `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ReadFailed`] if the level cannot be obtained.
    async fn read_sensor_level(&self, direction: Direction) -> Result<bool, GateError>;
}
