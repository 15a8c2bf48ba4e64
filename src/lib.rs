//! IoTransit Applet - Main Library
//!
//! Thin runner around the `iotransit` client library.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runner)
//! - **config**: Applet YAML configuration with environment overrides
//! - **logging**: tracing subscriber setup
//! - **iotransit**: Dual-channel client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use iotransit_applet::bin_common::{load_config_from_env, AppletRunner, ConfigType};
//! use iotransit_applet::config::AppletFileConfig;
//! ```

// Re-export workspace libraries for convenience
pub use iotransit;

pub mod config;
pub mod logging;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, ConfigType};
    pub use runner::{AppletRunner, RunConfig};
}
