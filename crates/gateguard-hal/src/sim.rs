//! In-process simulated host for CI/CD testing without a physical device.
//!
//! [`SimHost`] keeps the level of both limit inputs and the energised flag of
//! both outputs, records every [`OutputCommand`] it is asked to execute, and
//! can be armed to fail reads or output commands.  When built with
//! [`SimHost::with_notifications`] it also publishes a [`StatusNotification`]
//! for every level or output change, exactly as a real host would, including
//! the changes caused by the supervisor's own commands.
//!
//! # Example
//!
//! ```rust
//! use gateguard_hal::{ChannelMap, SimHost};
//! use gateguard_types::Direction;
//!
//! let host = SimHost::new(ChannelMap::default())
//!     .with_input_level(Direction::Open, true);
//!
//! host.energize(Direction::Close);
//! assert!(host.output(Direction::Close));
//! assert!(host.input_level(Direction::Open));
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use gateguard_types::{Direction, GateError, InputMode, OutputCommand};
use tokio::sync::mpsc;
use tracing::debug;

use crate::channel_map::{ChannelMap, StatusNotification};
use crate::host::{OutputDriver, SensorReader};

#[derive(Default)]
struct SimState {
    outputs: [bool; 2],
    inputs: [bool; 2],
    modes: [InputMode; 2],
    commands: Vec<OutputCommand>,
    fail_next_read: [bool; 2],
    fail_outputs: [bool; 2],
    fail_modes: bool,
    read_delay: [Duration; 2],
}

/// A simulated two-output host.  Share it behind an `Arc`.
pub struct SimHost {
    map: ChannelMap,
    state: Mutex<SimState>,
    notifier: Option<mpsc::UnboundedSender<StatusNotification>>,
}

impl SimHost {
    /// Create a host with both outputs off and both inputs low.
    pub fn new(map: ChannelMap) -> Self {
        Self {
            map,
            state: Mutex::new(SimState::default()),
            notifier: None,
        }
    }

    /// Publish a [`StatusNotification`] for every change from now on.
    pub fn with_notifications(mut self) -> (Self, mpsc::UnboundedReceiver<StatusNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notifier = Some(tx);
        (self, rx)
    }

    /// Set the initial raw level of an input without notifying.
    pub fn with_input_level(self, direction: Direction, raw: bool) -> Self {
        self.lock().inputs[direction.index()] = raw;
        self
    }

    /// Delay the startup read of `direction` by `delay`.
    pub fn with_read_delay(self, direction: Direction, delay: Duration) -> Self {
        self.lock().read_delay[direction.index()] = delay;
        self
    }

    /// Arm a failure for the next read of `direction`.
    pub fn with_failing_read(self, direction: Direction) -> Self {
        self.fail_next_read(direction);
        self
    }

    /// Make every input-mode command fail.
    pub fn with_failing_modes(self) -> Self {
        self.lock().fail_modes = true;
        self
    }

    pub fn channel_map(&self) -> ChannelMap {
        self.map
    }

    /// Arm a failure for the next read of `direction`.
    pub fn fail_next_read(&self, direction: Direction) {
        self.lock().fail_next_read[direction.index()] = true;
    }

    /// Make output commands for `direction` fail until disarmed.
    pub fn fail_outputs(&self, direction: Direction, failing: bool) {
        self.lock().fail_outputs[direction.index()] = failing;
    }

    /// Change an input level, as the physical limit switch would.
    pub fn set_input_level(&self, direction: Direction, raw: bool) {
        let changed = {
            let mut state = self.lock();
            let slot = &mut state.inputs[direction.index()];
            std::mem::replace(slot, raw) != raw
        };
        if changed {
            self.notify(StatusNotification::input(self.map.input_channel(direction), raw));
        }
    }

    /// Energise an output on behalf of an external actor (push button, remote).
    pub fn energize(&self, direction: Direction) {
        self.drive(direction, true);
    }

    /// De-energise an output on behalf of an external actor.
    pub fn release(&self, direction: Direction) {
        self.drive(direction, false);
    }

    pub fn output(&self, direction: Direction) -> bool {
        self.lock().outputs[direction.index()]
    }

    pub fn input_level(&self, direction: Direction) -> bool {
        self.lock().inputs[direction.index()]
    }

    pub fn input_mode(&self, direction: Direction) -> InputMode {
        self.lock().modes[direction.index()]
    }

    /// Every output command received so far, failed ones included.
    pub fn commands(&self) -> Vec<OutputCommand> {
        self.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    fn drive(&self, direction: Direction, on: bool) {
        let changed = {
            let mut state = self.lock();
            let slot = &mut state.outputs[direction.index()];
            std::mem::replace(slot, on) != on
        };
        if changed {
            self.notify(StatusNotification::switch(self.map.output_channel(direction), on));
        }
    }

    fn notify(&self, notification: StatusNotification) {
        if let Some(tx) = &self.notifier {
            // The receiver going away only means nobody listens any more.
            let _ = tx.send(notification);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OutputDriver for SimHost {
    async fn set_output(&self, direction: Direction, on: bool) -> Result<(), GateError> {
        let failing = {
            let mut state = self.lock();
            state.commands.push(OutputCommand { direction, on });
            state.fail_outputs[direction.index()]
        };
        if failing {
            return Err(GateError::OutputFailed {
                direction,
                details: "simulated relay fault".to_string(),
            });
        }
        debug!(%direction, on, "sim output");
        self.drive(direction, on);
        Ok(())
    }

    async fn set_input_mode(&self, direction: Direction, mode: InputMode) -> Result<(), GateError> {
        let mut state = self.lock();
        if state.fail_modes {
            return Err(GateError::ModeConfigFailed {
                direction,
                details: "simulated config rejection".to_string(),
            });
        }
        state.modes[direction.index()] = mode;
        Ok(())
    }
}

#[async_trait]
impl SensorReader for SimHost {
    async fn read_sensor_level(&self, direction: Direction) -> Result<bool, GateError> {
        let delay = self.lock().read_delay[direction.index()];
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_read[direction.index()]) {
            return Err(GateError::ReadFailed {
                direction,
                details: "simulated read timeout".to_string(),
            });
        }
        Ok(state.inputs[direction.index()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateguard_types::HostEvent;

    #[tokio::test]
    async fn set_output_records_commands_and_state() {
        let host = SimHost::new(ChannelMap::default());
        host.set_output(Direction::Open, true).await.unwrap();
        host.set_output(Direction::Close, false).await.unwrap();

        assert!(host.output(Direction::Open));
        assert!(!host.output(Direction::Close));
        assert_eq!(
            host.commands(),
            vec![
                OutputCommand {
                    direction: Direction::Open,
                    on: true
                },
                OutputCommand::off(Direction::Close),
            ]
        );
    }

    #[tokio::test]
    async fn failing_output_is_recorded_but_not_applied() {
        let host = SimHost::new(ChannelMap::default());
        host.energize(Direction::Close);
        host.fail_outputs(Direction::Close, true);

        let err = host.set_output(Direction::Close, false).await.unwrap_err();
        assert!(matches!(err, GateError::OutputFailed { .. }));
        assert!(host.output(Direction::Close));
        assert_eq!(host.commands(), vec![OutputCommand::off(Direction::Close)]);
    }

    #[tokio::test]
    async fn read_failure_is_one_shot() {
        let host = SimHost::new(ChannelMap::default())
            .with_input_level(Direction::Open, true)
            .with_failing_read(Direction::Open);

        assert!(host.read_sensor_level(Direction::Open).await.is_err());
        assert!(host.read_sensor_level(Direction::Open).await.unwrap());
    }

    #[tokio::test]
    async fn input_mode_is_stored_unless_failing() {
        let host = SimHost::new(ChannelMap::default());
        host.set_input_mode(Direction::Open, InputMode::Detached)
            .await
            .unwrap();
        assert_eq!(host.input_mode(Direction::Open), InputMode::Detached);
        assert_eq!(host.input_mode(Direction::Close), InputMode::Momentary);

        let host = SimHost::new(ChannelMap::default()).with_failing_modes();
        assert!(host
            .set_input_mode(Direction::Open, InputMode::Detached)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn notifications_only_fire_on_change() {
        let map = ChannelMap::default();
        let (host, mut rx) = SimHost::new(map).with_notifications();

        host.set_input_level(Direction::Close, true);
        host.set_input_level(Direction::Close, true);
        host.energize(Direction::Open);
        host.set_output(Direction::Open, false).await.unwrap();
        host.set_output(Direction::Open, false).await.unwrap();

        let mut routed = Vec::new();
        while let Ok(n) = rx.try_recv() {
            routed.push(map.route(&n));
        }
        assert_eq!(
            routed,
            vec![
                Some(HostEvent::SensorLevelChanged {
                    direction: Direction::Close,
                    raw: true
                }),
                Some(HostEvent::OutputChanged {
                    direction: Direction::Open,
                    on: true
                }),
                Some(HostEvent::OutputChanged {
                    direction: Direction::Open,
                    on: false
                }),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_delay_is_honoured() {
        let host = SimHost::new(ChannelMap::default())
            .with_read_delay(Direction::Close, Duration::from_millis(50));
        let start = tokio::time::Instant::now();
        host.read_sensor_level(Direction::Close).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
