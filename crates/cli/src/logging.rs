//! Logging setup for the navload binary

use std::io;

use anyhow::Context;
use navload_orm::NavloadConfig;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How diagnostics are written
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level filter used when `RUST_LOG` is unset
    pub level: String,
    /// One JSON object per event
    pub json_format: bool,
    /// Multi-line human-oriented output
    pub pretty_print: bool,
    /// Overrides `level`, e.g. "navload_orm=debug,navload=info"
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_config(config: &NavloadConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            json_format: config.log_json,
            ..Self::default()
        }
    }

    /// Debug output with round-trip traces from the loader
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            env_filter: Some("navload_orm=debug,navload=debug".to_string()),
        }
    }

    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> anyhow::Result<EnvFilter> {
        let directives = self.env_filter.as_deref().unwrap_or(&self.level);
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directives))
            .with_context(|| format!("invalid log filter '{}'", directives))
    }
}

/// Install the global subscriber. Diagnostics go to stderr so command output
/// on stdout stays machine-readable.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = config.filter()?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?;
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).pretty())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr))
            .try_init()?;
    }

    tracing::debug!(
        target: "navload::logging",
        "Logging initialized (level: {}, format: {})",
        config.level,
        if config.json_format { "JSON" } else { "text" }
    );
    Ok(())
}
