use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::poll::BackoffPoller;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding persisted flow snapshots and logs
    pub state: String,
}

/// Checkout backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Base URL of the backend project (edge functions live under
    /// `/functions/v1/`)
    pub api_base_url: String,
    /// Public anon key sent as a bearer token
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Base delay between payment-status checks (default: 5000 ms)
    #[serde(default = "default_poll_base_delay_ms")]
    pub poll_base_delay_ms: u64,
    /// Ceiling on the delay between checks (default: 60000 ms)
    #[serde(default = "default_poll_max_delay_ms")]
    pub poll_max_delay_ms: u64,
    /// Attempt budget before asking the user to refresh (default: 20)
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
    /// Per-request HTTP timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retry attempts for session/credential calls (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_poll_base_delay_ms() -> u64 {
    5000 // 5 seconds
}

fn default_poll_max_delay_ms() -> u64 {
    60000 // 1 minute
}

fn default_poll_max_attempts() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

impl CheckoutConfig {
    /// Build a payment poller from the configured delays and budget.
    pub fn backoff(&self) -> BackoffPoller {
        BackoffPoller::new(
            Duration::from_millis(self.poll_base_delay_ms),
            Duration::from_millis(self.poll_max_delay_ms),
            self.poll_max_attempts,
        )
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to a file under the state directory (false = stderr)
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".funnel/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the CLI works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // Project config (primary location)
        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/funnel/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("funnel").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with FUNNEL_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("FUNNEL")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .funnel/config.toml
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::project_config_path())
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to the state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to the logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                state: ".funnel".to_string(), // Relative to cwd
            },
            checkout: CheckoutConfig {
                api_base_url: String::new(), // Set during setup
                anon_key: None,
                poll_base_delay_ms: default_poll_base_delay_ms(),
                poll_max_delay_ms: default_poll_max_delay_ms(),
                poll_max_attempts: default_poll_max_attempts(),
                request_timeout_secs: default_request_timeout_secs(),
                max_retries: default_max_retries(),
            },
            logging: LoggingConfig::default(),
        }
    }
}
