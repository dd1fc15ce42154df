//! [`ChannelMap`] – binds directions to physical host channels.
//!
//! The host reports status changes per *component*, named `"input:<n>"` for
//! digital inputs and `"switch:<n>"` for relay outputs, together with a delta
//! that carries only the fields that changed.  [`ChannelMap::route`] turns
//! such a notification into a direction-tagged [`HostEvent`], or `None` when
//! the notification is irrelevant to the gate (unmapped component, or a delta
//! without the interesting field).

use std::fmt;
use std::str::FromStr;

use gateguard_types::{Direction, GateError, HostEvent};
use tracing::trace;

/// A parsed host component identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Input(u8),
    Switch(u8),
}

impl FromStr for ComponentId {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || GateError::UnknownComponent(s.to_string());
        let (kind, channel) = s.split_once(':').ok_or_else(unknown)?;
        let channel: u8 = channel.parse().map_err(|_| unknown())?;
        match kind {
            "input" => Ok(ComponentId::Input(channel)),
            "switch" => Ok(ComponentId::Switch(channel)),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Input(ch) => write!(f, "input:{ch}"),
            ComponentId::Switch(ch) => write!(f, "switch:{ch}"),
        }
    }
}

/// Changed fields of a component status.  Absent fields did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusDelta {
    /// Input level.
    pub state: Option<bool>,
    /// Relay energised flag.
    pub output: Option<bool>,
}

/// A raw status notification as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotification {
    pub component: String,
    pub delta: StatusDelta,
}

impl StatusNotification {
    pub fn input(channel: u8, state: bool) -> Self {
        Self {
            component: ComponentId::Input(channel).to_string(),
            delta: StatusDelta {
                state: Some(state),
                output: None,
            },
        }
    }

    pub fn switch(channel: u8, output: bool) -> Self {
        Self {
            component: ComponentId::Switch(channel).to_string(),
            delta: StatusDelta {
                state: None,
                output: Some(output),
            },
        }
    }
}

/// Which host channel carries each direction's output and limit input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    pub open_output: u8,
    pub close_output: u8,
    pub open_input: u8,
    pub close_input: u8,
}

impl Default for ChannelMap {
    /// Switch 1 opens, switch 0 closes; input 1 is the open limit and input 0
    /// the close limit.
    fn default() -> Self {
        Self {
            open_output: 1,
            close_output: 0,
            open_input: 1,
            close_input: 0,
        }
    }
}

impl ChannelMap {
    /// Reject maps where both directions share a channel.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Config`] describing the shared channel.
    pub fn validate(&self) -> Result<(), GateError> {
        if self.open_output == self.close_output {
            return Err(GateError::Config(format!(
                "open and close share output channel {}",
                self.open_output
            )));
        }
        if self.open_input == self.close_input {
            return Err(GateError::Config(format!(
                "open and close share input channel {}",
                self.open_input
            )));
        }
        Ok(())
    }

    pub fn output_channel(&self, direction: Direction) -> u8 {
        match direction {
            Direction::Open => self.open_output,
            Direction::Close => self.close_output,
        }
    }

    pub fn input_channel(&self, direction: Direction) -> u8 {
        match direction {
            Direction::Open => self.open_input,
            Direction::Close => self.close_input,
        }
    }

    /// Resolve a component id to the direction it belongs to.
    pub fn direction_of(&self, component: ComponentId) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| match component {
            ComponentId::Input(ch) => self.input_channel(d) == ch,
            ComponentId::Switch(ch) => self.output_channel(d) == ch,
        })
    }

    /// Translate a raw host notification into a [`HostEvent`].
    pub fn route(&self, notification: &StatusNotification) -> Option<HostEvent> {
        let component = match notification.component.parse::<ComponentId>() {
            Ok(c) => c,
            Err(e) => {
                trace!(error = %e, "ignoring notification");
                return None;
            }
        };
        let Some(direction) = self.direction_of(component) else {
            trace!(%component, "component not mapped to a direction");
            return None;
        };
        match component {
            ComponentId::Input(_) => notification
                .delta
                .state
                .map(|raw| HostEvent::SensorLevelChanged { direction, raw }),
            ComponentId::Switch(_) => notification
                .delta
                .output
                .map(|on| HostEvent::OutputChanged { direction, on }),
        }
    }
}
