//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `hvacq.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use hvacq_adapter_virtual::VirtualConfig;
use hvacq_app::settings::{BridgeSettings, PollSchedule, RetryPolicy};
use hvacq_domain::error::ValidationError;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Poll cadence and throttling.
    pub polling: PollingConfig,
    /// Command pipeline timings.
    pub commands: CommandsConfig,
    /// The simulated account served by this daemon.
    #[serde(rename = "virtual")]
    pub simulated: VirtualConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub fast_interval_secs: u64,
    pub slow_interval_secs: u64,
    /// Skip scheduled polls while fewer calls than this remain. `0` disables.
    pub throttle_threshold: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub debounce_secs: u64,
    pub call_timeout_secs: u64,
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub retry_backoff_ms: u64,
    pub batch_settle_max_secs: u64,
    pub optimistic_grace_secs: u64,
}

impl Config {
    /// Load configuration from `hvacq.toml` (if present), apply
    /// environment-variable overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, if an
    /// override variable does not parse, or if the resulting configuration
    /// is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("hvacq.toml")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// A variable that is set but does not parse is an error, not a
    /// silent fallback to the file or default value.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = var("HVACQ_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("HVACQ_PORT") {
            self.server.port = parse_var("HVACQ_PORT", &val, "a TCP port")?;
        }
        if let Some(val) = var("HVACQ_BIND") {
            let (host, port) = val.rsplit_once(':').ok_or_else(|| {
                ConfigError::Validation(format!("HVACQ_BIND={val:?} is not host:port"))
            })?;
            self.server.port = parse_var("HVACQ_BIND", port, "a TCP port")?;
            self.server.host = host.to_string();
        }
        if let Some(val) = var("HVACQ_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("HVACQ_FAST_POLL_SECS") {
            self.polling.fast_interval_secs =
                parse_var("HVACQ_FAST_POLL_SECS", &val, "a number of seconds")?;
        }
        if let Some(val) = var("HVACQ_SLOW_POLL_SECS") {
            self.polling.slow_interval_secs =
                parse_var("HVACQ_SLOW_POLL_SECS", &val, "a number of seconds")?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        self.bridge_settings()?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Translate the `[polling]` and `[commands]` sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Settings`] when an interval or timeout is zero.
    pub fn bridge_settings(&self) -> Result<BridgeSettings, ConfigError> {
        let schedule = PollSchedule::new(
            Duration::from_secs(self.polling.fast_interval_secs),
            Duration::from_secs(self.polling.slow_interval_secs),
        )?;
        let commands = &self.commands;
        let settings = BridgeSettings {
            debounce: Duration::from_secs(commands.debounce_secs),
            call_timeout: Duration::from_secs(commands.call_timeout_secs),
            retry: RetryPolicy {
                max_retries: commands.max_retries,
                initial_backoff: Duration::from_millis(commands.retry_backoff_ms),
                ..RetryPolicy::default()
            },
            batch_settle_max: Duration::from_secs(commands.batch_settle_max_secs),
            optimistic_grace: Duration::from_secs(commands.optimistic_grace_secs),
            schedule,
            throttle_threshold: self.polling.throttle_threshold,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str, expected: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{name}={raw:?} is not {expected}")))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hvacqd=info,hvacq=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            fast_interval_secs: 3600,
            slow_interval_secs: 86_400,
            throttle_threshold: 0,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            debounce_secs: 5,
            call_timeout_secs: 10,
            max_retries: 3,
            retry_backoff_ms: 1000,
            batch_settle_max_secs: 5,
            optimistic_grace_secs: 30,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// Bridge settings rejected by the core.
    #[error("invalid bridge settings: {0}")]
    Settings(#[from] ValidationError),
}
