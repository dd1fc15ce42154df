//! Configuration vault – reads/writes `~/.gateguard/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use gateguard_hal::ChannelMap;
use gateguard_runtime::RuntimeConfig;
use gateguard_types::SensorPolarity;

/// Persisted deployment configuration.
///
/// The defaults describe the factory wiring: switch 1 opens, switch 0
/// closes, input 1 is the open limit and input 0 the close limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Host switch channel driving OPEN.
    #[serde(default = "default_open_channel")]
    pub open_output: u8,

    /// Host switch channel driving CLOSE.
    #[serde(default = "default_close_channel")]
    pub close_output: u8,

    /// Host input channel of the OPEN limit sensor.
    #[serde(default = "default_open_channel")]
    pub open_input: u8,

    /// Host input channel of the CLOSE limit sensor.
    #[serde(default = "default_close_channel")]
    pub close_input: u8,

    #[serde(default)]
    pub open_polarity: SensorPolarity,

    #[serde(default)]
    pub close_polarity: SensorPolarity,

    /// Decouple both inputs from the host's local relay control at startup.
    #[serde(default)]
    pub detach_inputs: bool,

    /// Route supervisor diagnostics to the log.
    #[serde(default = "default_debug")]
    pub debug: bool,

    /// Bounded event queue size.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_open_channel() -> u8 {
    1
}
fn default_close_channel() -> u8 {
    0
}
fn default_debug() -> bool {
    true
}
fn default_queue_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            open_output: default_open_channel(),
            close_output: default_close_channel(),
            open_input: default_open_channel(),
            close_input: default_close_channel(),
            open_polarity: SensorPolarity::default(),
            close_polarity: SensorPolarity::default(),
            detach_inputs: false,
            debug: default_debug(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Config {
    pub fn channel_map(&self) -> ChannelMap {
        ChannelMap {
            open_output: self.open_output,
            close_output: self.close_output,
            open_input: self.open_input,
            close_input: self.close_input,
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            open_polarity: self.open_polarity,
            close_polarity: self.close_polarity,
            detach_inputs: self.detach_inputs,
            queue_capacity: self.queue_capacity,
        }
    }
}

/// Return the path to `~/.gateguard/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".gateguard").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config at `path` and apply env overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    let Some(mut cfg) = read_from(path)? else {
        return Ok(None);
    };
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Read, parse and validate the file at `path`.  Ignores the environment.
pub(crate) fn read_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    cfg.channel_map().validate().map_err(|e| e.to_string())?;
    Ok(Some(cfg))
}

/// Apply `GATEGUARD_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `GATEGUARD_OPEN_POLARITY` | `open_polarity` |
/// | `GATEGUARD_CLOSE_POLARITY` | `close_polarity` |
/// | `GATEGUARD_DETACH_INPUTS` | `detach_inputs` |
/// | `GATEGUARD_DEBUG` | `debug` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("GATEGUARD_OPEN_POLARITY")
        && let Ok(p) = v.parse::<SensorPolarity>()
    {
        cfg.open_polarity = p;
    }
    if let Ok(v) = std::env::var("GATEGUARD_CLOSE_POLARITY")
        && let Ok(p) = v.parse::<SensorPolarity>()
    {
        cfg.close_polarity = p;
    }
    if let Ok(v) = std::env::var("GATEGUARD_DETACH_INPUTS")
        && let Some(b) = parse_flag(&v)
    {
        cfg.detach_inputs = b;
    }
    if let Ok(v) = std::env::var("GATEGUARD_DEBUG")
        && let Some(b) = parse_flag(&v)
    {
        cfg.debug = b;
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config to disk, creating `~/.gateguard/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
