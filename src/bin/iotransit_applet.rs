use anyhow::Result;
use iotransit_applet::bin_common::{load_config_from_env, AppletRunner, ConfigType, RunConfig};
use iotransit_applet::config::AppletFileConfig;
use iotransit_applet::iotransit::IoTransitClient;
use iotransit_applet::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = load_config_from_env(ConfigType::Applet);
    let config = if config_path.exists() {
        AppletFileConfig::load(&config_path)?
    } else {
        AppletFileConfig::from_env()?
    };

    init_tracing(&config.log_level);
    if !config_path.exists() {
        tracing::info!(
            "No config file at {}, using environment",
            config_path.display()
        );
    }
    config.log();

    let client = IoTransitClient::new(config.options.clone())?;
    let runner = AppletRunner::new(client, RunConfig::new("IoTransit Applet"));
    runner.run().await?;

    Ok(())
}
