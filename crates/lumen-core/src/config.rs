//! Output configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. Environment lookup is injected so tests never touch
//! the real process environment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::logging::LogConfig;

/// Standard Art-Net UDP port
pub const ARTNET_PORT: u16 = 6454;

/// Highest universe count addressable by a 15-bit Art-Net port address
pub const MAX_UNIVERSES: u16 = 32768;

/// Upper bound for either transmission rate
pub const MAX_RATE_HZ: u32 = 1000;

/// Environment variable names
pub mod env {
    /// Number of universes
    pub const UNIVERSE_COUNT: &str = "DMX_UNIVERSE_COUNT";
    /// High-rate transmission frequency
    pub const REFRESH_RATE: &str = "DMX_REFRESH_RATE";
    /// Idle keep-alive frequency
    pub const IDLE_RATE: &str = "DMX_IDLE_RATE";
    /// How long high-rate mode lasts after the last change
    pub const HIGH_RATE_DURATION: &str = "DMX_HIGH_RATE_DURATION";
    /// Drift warning threshold, 0 disables
    pub const DRIFT_THRESHOLD: &str = "DMX_DRIFT_THRESHOLD";
    /// Minimum time between drift warnings
    pub const DRIFT_THROTTLE: &str = "DMX_DRIFT_THROTTLE";
    /// Enable Art-Net output
    pub const ARTNET_ENABLED: &str = "ARTNET_ENABLED";
    /// Broadcast destination address
    pub const ARTNET_BROADCAST: &str = "ARTNET_BROADCAST";
    /// Destination UDP port
    pub const ARTNET_PORT: &str = "ARTNET_PORT";
    /// Default log level
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

/// DMX output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of universes, numbered `1..=universe_count`
    pub universe_count: u16,
    /// Transmission rate while changes are happening
    pub refresh_rate_hz: u32,
    /// Keep-alive rate when nothing changes
    pub idle_rate_hz: u32,
    /// Time after the last change before dropping to the idle rate
    pub high_rate_duration_ms: u64,
    /// Send Art-Net packets; when false the engine runs in simulation mode
    pub artnet_enabled: bool,
    /// Broadcast destination address
    pub broadcast_address: String,
    /// Destination UDP port
    pub artnet_port: u16,
    /// Tick drift that triggers a warning, 0 disables drift monitoring
    pub drift_threshold_ms: u64,
    /// Minimum time between two drift warnings
    pub drift_throttle_ms: u64,
    /// Logging settings
    pub logging: LogConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            universe_count: 4,
            refresh_rate_hz: 44,
            idle_rate_hz: 1,
            high_rate_duration_ms: 2000,
            artnet_enabled: true,
            broadcast_address: "255.255.255.255".to_string(),
            artnet_port: ARTNET_PORT,
            drift_threshold_ms: 50,
            drift_throttle_ms: 5000,
            logging: LogConfig::default(),
        }
    }
}

impl OutputConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                tracing::debug!("Loaded configuration from {:?}", path);
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, env::UNIVERSE_COUNT)? {
            self.universe_count = v;
        }
        if let Some(v) = parse_var(&lookup, env::REFRESH_RATE)? {
            self.refresh_rate_hz = v;
        }
        if let Some(v) = parse_var(&lookup, env::IDLE_RATE)? {
            self.idle_rate_hz = v;
        }
        if let Some(v) = parse_var(&lookup, env::HIGH_RATE_DURATION)? {
            self.high_rate_duration_ms = v;
        }
        if let Some(v) = parse_var(&lookup, env::DRIFT_THRESHOLD)? {
            self.drift_threshold_ms = v;
        }
        if let Some(v) = parse_var(&lookup, env::DRIFT_THROTTLE)? {
            self.drift_throttle_ms = v;
        }
        if let Some(raw) = lookup(env::ARTNET_ENABLED) {
            self.artnet_enabled = parse_bool(env::ARTNET_ENABLED, &raw)?;
        }
        if let Some(raw) = lookup(env::ARTNET_BROADCAST) {
            let raw = raw.trim();
            if !raw.is_empty() {
                self.broadcast_address = raw.to_string();
            }
        }
        if let Some(v) = parse_var(&lookup, env::ARTNET_PORT)? {
            self.artnet_port = v;
        }
        if let Some(raw) = lookup(env::LOG_LEVEL) {
            self.logging.level = raw.trim().to_string();
        }
        Ok(())
    }

    /// Check value ranges and cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.universe_count == 0 || self.universe_count > MAX_UNIVERSES {
            return Err(CoreError::Validation(format!(
                "universe_count must be 1-{}, got {}",
                MAX_UNIVERSES, self.universe_count
            )));
        }
        for (name, rate) in [
            ("refresh_rate_hz", self.refresh_rate_hz),
            ("idle_rate_hz", self.idle_rate_hz),
        ] {
            if rate == 0 || rate > MAX_RATE_HZ {
                return Err(CoreError::Validation(format!(
                    "{} must be 1-{}, got {}",
                    name, MAX_RATE_HZ, rate
                )));
            }
        }
        if self.idle_rate_hz > self.refresh_rate_hz {
            return Err(CoreError::Validation(format!(
                "idle_rate_hz ({}) must not exceed refresh_rate_hz ({})",
                self.idle_rate_hz, self.refresh_rate_hz
            )));
        }
        if self.artnet_enabled && self.broadcast_address.trim().is_empty() {
            return Err(CoreError::Validation(
                "broadcast_address must be set when Art-Net is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// How long high-rate mode outlives the last change
    pub fn high_rate_duration(&self) -> Duration {
        Duration::from_millis(self.high_rate_duration_ms)
    }

    /// Drift warning threshold, `None` when monitoring is disabled
    pub fn drift_threshold(&self) -> Option<Duration> {
        (self.drift_threshold_ms > 0).then(|| Duration::from_millis(self.drift_threshold_ms))
    }

    /// Minimum time between drift warnings
    pub fn drift_throttle(&self) -> Duration {
        Duration::from_millis(self.drift_throttle_ms)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| CoreError::InvalidConfig {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::InvalidConfig {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
