//! CLI utilities for binaries
//!
//! Handles configuration path resolution from environment variables.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Applet configuration (config/applet.yaml)
    Applet,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Applet => "config/applet.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Environment variable that overrides the default path, if any
    pub fn env_var_name(&self) -> Option<&str> {
        match self {
            ConfigType::Applet => Some("IOTRANSIT_CONFIG_PATH"),
            ConfigType::Custom(_) => None,
        }
    }
}

/// Load configuration path from environment or use default
///
/// A `Custom` path is taken as given.
///
/// # Examples
/// ```
/// use iotransit_applet::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Applet);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    config_type
        .env_var_name()
        .and_then(|name| std::env::var(name).ok())
        .unwrap_or_else(|| config_type.default_path().to_string())
        .into()
}
