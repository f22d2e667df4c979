//! Event bus configuration

use crate::address::{DEFAULT_TOPIC, RESERVED_CHANNELS};
use crate::error::{EventError, ListenerFailure, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::sync::Arc;

/// Callback receiving every listener failure.
pub type FailureReporter = Arc<dyn Fn(&ListenerFailure) + Send + Sync>;

/// Event bus configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Topic used by broadcasts that do not name one
    pub default_topic: String,

    /// Channels every view subscribes to when it mounts
    pub default_channels: Vec<String>,

    /// Enable subscription and dispatch logging
    pub enable_logging: bool,

    /// Receives listener failures in addition to the error log
    #[serde(skip)]
    pub failure_reporter: Option<FailureReporter>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            default_topic: DEFAULT_TOPIC.to_string(),
            default_channels: RESERVED_CHANNELS.iter().map(|c| c.to_string()).collect(),
            enable_logging: true,
            failure_reporter: None,
        }
    }
}

impl EventBusConfig {
    /// Parse configuration from a TOML document.
    ///
    /// Missing keys keep their defaults.
    ///
    /// ```
    /// use mosaic_events::EventBusConfig;
    ///
    /// let config = EventBusConfig::from_toml_str(r#"
    ///     default_topic = "page"
    ///     default_channels = ["all"]
    /// "#).unwrap();
    ///
    /// assert_eq!(config.default_topic, "page");
    /// assert_eq!(config.default_channels, vec!["all".to_string()]);
    /// assert!(config.enable_logging);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| EventError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `MOSAIC_BUS_*` environment variables.
    ///
    /// - `MOSAIC_BUS_DEFAULT_TOPIC`
    /// - `MOSAIC_BUS_DEFAULT_CHANNELS` (comma separated)
    /// - `MOSAIC_BUS_ENABLE_LOGGING`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(topic) = lookup("MOSAIC_BUS_DEFAULT_TOPIC") {
            config.default_topic = topic;
        }

        if let Some(channels) = lookup("MOSAIC_BUS_DEFAULT_CHANNELS") {
            config.default_channels = channels
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(value) = lookup("MOSAIC_BUS_ENABLE_LOGGING") {
            config.enable_logging = parse_flag("MOSAIC_BUS_ENABLE_LOGGING", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would produce invalid addresses.
    pub fn validate(&self) -> Result<()> {
        if self.default_topic.trim().is_empty() {
            return Err(EventError::Config("default_topic must not be empty".into()));
        }

        if let Some(position) = self
            .default_channels
            .iter()
            .position(|c| c.trim().is_empty())
        {
            return Err(EventError::Config(format!(
                "default_channels[{}] must not be empty",
                position
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for EventBusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBusConfig")
            .field("default_topic", &self.default_topic)
            .field("default_channels", &self.default_channels)
            .field("enable_logging", &self.enable_logging)
            .field("failure_reporter", &self.failure_reporter.is_some())
            .finish()
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EventError::Config(format!(
            "{} expects a boolean, got {:?}",
            key, other
        ))),
    }
}
