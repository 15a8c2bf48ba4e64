//! Applet configuration file
//!
//! YAML file holding the log level next to the client options, with the
//! credentials overridable from the environment (`.env` is honored).
//!
//! ```yaml
//! log_level: info
//! appletId: A1
//! accepts: [A1, grp1]
//! connectEE: false
//! reconnectionTimer: 2000
//! ```

use iotransit::core::{AppletOptions, ClientConfig};
use iotransit::IoTransitError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const AUTH_USER_ENV: &str = "IOTRANSIT_AUTH_USER";
pub const AUTH_PASS_ENV: &str = "IOTRANSIT_AUTH_PASS";
pub const APPLET_ID_ENV: &str = "IOTRANSIT_APPLET_ID";

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Client(#[from] IoTransitError),
}

pub type Result<T> = std::result::Result<T, AppConfigError>;

/// Applet runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppletFileConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Client options, camelCase keys at the top level of the file
    #[serde(flatten)]
    pub options: AppletOptions,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppletFileConfig {
    /// Load configuration from a YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&yaml_content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Configuration for a bare applet id, taken from `IOTRANSIT_APPLET_ID`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let applet_id = std::env::var(APPLET_ID_ENV)
            .map_err(|_| AppConfigError::EnvVarMissing(APPLET_ID_ENV.to_string()))?;
        let mut config = Self {
            log_level: default_log_level(),
            options: AppletOptions::new(applet_id),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Override credentials from variables found through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(user) = lookup(AUTH_USER_ENV) {
            info!("Overriding auth user from environment variable");
            self.options.auth_user = Some(user);
        }
        if let Some(pass) = lookup(AUTH_PASS_ENV) {
            info!("Overriding auth password from environment variable");
            self.options.auth_pass = Some(pass);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AppConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        self.client_config()?;
        Ok(())
    }

    /// Resolve the client options against the library defaults
    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig::resolve(self.options.clone())?)
    }

    /// Log configuration summary
    pub fn log(&self) {
        let Ok(resolved) = self.client_config() else {
            return;
        };
        info!("Configuration loaded:");
        info!("  Applet id: {}", resolved.applet_id());
        info!("  Accepts: {}", resolved.accept_tags().join(", "));
        for id in iotransit::ChannelId::ALL {
            let channel = resolved.channel(id);
            if channel.enabled {
                info!("  {} engine: {}", id, channel.endpoint.url());
            } else {
                info!("  {} engine: disabled", id);
            }
        }
        info!(
            "  Auto-reconnect: {} ({:?})",
            resolved.auto_reconnect(),
            resolved.reconnection_delay()
        );
        info!("  Log level: {}", self.log_level);
    }
}
