use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two mutually exclusive actuator motions.
///
/// Every output, every limit sensor, and every host event is tagged with
/// exactly one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Open,
    Close,
}

impl Direction {
    /// Both directions, OPEN first.
    pub const ALL: [Direction; 2] = [Direction::Open, Direction::Close];

    /// The other direction of the pair.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Open => Direction::Close,
            Direction::Close => Direction::Open,
        }
    }

    /// Stable slot index used by per-direction arrays.
    pub fn index(self) -> usize {
        match self {
            Direction::Open => 0,
            Direction::Close => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Open => write!(f, "open"),
            Direction::Close => write!(f, "close"),
        }
    }
}

impl FromStr for Direction {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Direction::Open),
            "close" => Ok(Direction::Close),
            other => Err(GateError::Config(format!("unknown direction '{other}'"))),
        }
    }
}

/// Mapping rule from a raw sensor level to "limit reached".
///
/// `ActiveLow` is the normally-closed wiring: a raw `false` means the limit
/// has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorPolarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl SensorPolarity {
    /// Whether `raw` means the limit is reached under this polarity.
    pub fn is_active(self, raw: bool) -> bool {
        match self {
            SensorPolarity::ActiveHigh => raw,
            SensorPolarity::ActiveLow => !raw,
        }
    }
}

impl fmt::Display for SensorPolarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorPolarity::ActiveHigh => write!(f, "active_high"),
            SensorPolarity::ActiveLow => write!(f, "active_low"),
        }
    }
}

impl FromStr for SensorPolarity {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "active_high" | "high" => Ok(SensorPolarity::ActiveHigh),
            "active_low" | "low" | "nc" => Ok(SensorPolarity::ActiveLow),
            other => Err(GateError::Config(format!("unknown polarity '{other}'"))),
        }
    }
}

/// Last-known logical state of one limit sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitState {
    /// No reading has been received yet.
    #[default]
    Unknown,
    NotReached,
    Reached,
}

impl LimitState {
    pub fn from_active(active: bool) -> Self {
        if active {
            LimitState::Reached
        } else {
            LimitState::NotReached
        }
    }

    pub fn is_reached(self) -> bool {
        self == LimitState::Reached
    }
}

impl fmt::Display for LimitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitState::Unknown => write!(f, "unknown"),
            LimitState::NotReached => write!(f, "not reached"),
            LimitState::Reached => write!(f, "reached"),
        }
    }
}

/// Fire-and-forget instruction to drive one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputCommand {
    pub direction: Direction,
    pub on: bool,
}

impl OutputCommand {
    /// De-energise the output of `direction`.
    pub fn off(direction: Direction) -> Self {
        Self {
            direction,
            on: false,
        }
    }
}

impl fmt::Display for OutputCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "set_output({}, {})",
            self.direction,
            if self.on { "on" } else { "off" }
        )
    }
}

/// How the host couples a physical input to its local relay control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Momentary,
    /// The input only reports its level; it never switches the relay.
    Detached,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Momentary => write!(f, "momentary"),
            InputMode::Detached => write!(f, "detached"),
        }
    }
}

/// A notification delivered by the host, already resolved to a direction.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A configured limit input changed level.
    SensorLevelChanged { direction: Direction, raw: bool },
    /// A configured output changed its energised state, whatever the cause.
    OutputChanged { direction: Direction, on: bool },
    /// Completion of the startup "read current sensor level" request.
    StartupRead {
        direction: Direction,
        result: Result<bool, GateError>,
    },
}

impl HostEvent {
    pub fn direction(&self) -> Direction {
        match self {
            HostEvent::SensorLevelChanged { direction, .. }
            | HostEvent::OutputChanged { direction, .. }
            | HostEvent::StartupRead { direction, .. } => *direction,
        }
    }
}

/// Diagnostic emitted by the safety core. Purely informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    LimitChanged {
        direction: Direction,
        from: LimitState,
        to: LimitState,
    },
    /// A limit is reached, so its output is forced off.
    LimitCutoff { direction: Direction },
    /// An activation was reversed because its limit is reached.
    ActivationBlocked { direction: Direction },
    /// Activating `activated` forced the other output off.
    Interlock {
        activated: Direction,
        forced_off: Direction,
    },
    /// An output event arrived before both sensors were known.
    IgnoredBeforeInit { direction: Direction },
    StartupReadFailed { direction: Direction, error: String },
    /// A startup result arrived after a live reading for the same direction.
    StaleStartupRead { direction: Direction },
    Initialized { open: LimitState, close: LimitState },
    /// Both limits reached at once; the wiring should be checked.
    BothLimitsReached,
    CommandFailed { command: OutputCommand, error: String },
    InputModeFailed { direction: Direction, error: String },
}

/// A [`Diagnostic`] stamped with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub diagnostic: Diagnostic,
}

impl DiagnosticRecord {
    pub fn now(diagnostic: Diagnostic) -> Self {
        Self {
            timestamp: Utc::now(),
            diagnostic,
        }
    }
}

/// Error type shared by the host seam, the runtime and the CLI.
///
/// Host failures are opaque to the safety core; `details` is only rendered.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateError {
    #[error("Output command failed on {direction}: {details}")]
    OutputFailed { direction: Direction, details: String },

    #[error("Sensor read failed on {direction}: {details}")]
    ReadFailed { direction: Direction, details: String },

    #[error("Input mode configuration failed on {direction}: {details}")]
    ModeConfigFailed { direction: Direction, details: String },

    #[error("Unknown host component: {0}")]
    UnknownComponent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime is no longer running")]
    RuntimeStopped,
}
