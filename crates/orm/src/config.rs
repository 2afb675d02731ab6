//! Configuration for the loader and the bundled in-memory source

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Simulated round-trip behaviour of the in-memory store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceConfig {
    /// Delay added to every read
    pub latency: Duration,
    /// Reads slower than this fail with `SourceError::Timeout`
    pub timeout: Option<Duration>,
}

impl SourceConfig {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options of the loading engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Longest accepted relationship path
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

/// Process-level configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavloadConfig {
    pub source: SourceConfig,
    pub engine: EngineConfig,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for NavloadConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            engine: EngineConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl NavloadConfig {
    /// Load configuration from `NAVLOAD_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("NAVLOAD_LATENCY_MS") {
            config.source.latency = Duration::from_millis(parse_number("latency_ms", &value)?);
        }

        if let Some(value) = lookup("NAVLOAD_TIMEOUT_MS") {
            let millis = parse_number("timeout_ms", &value)?;
            config.source.timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Some(value) = lookup("NAVLOAD_MAX_DEPTH") {
            config.engine.max_depth = parse_number("max_depth", &value)? as usize;
        }

        if let Some(level) = lookup("NAVLOAD_LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }

        if let Some(value) = lookup("NAVLOAD_LOG_JSON") {
            config.log_json = match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "log_json".to_string(),
                        value,
                        expected: "true or false".to_string(),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_depth".to_string(),
                value: "0".to_string(),
                expected: "a depth of at least 1".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                value: self.log_level.clone(),
                expected: format!("one of: {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }
}

fn parse_number(field: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: "a non-negative integer".to_string(),
    })
}
