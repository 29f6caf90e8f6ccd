pub mod config;
pub mod error;

pub use config::{
    Config, DeviceConfig, LocationConfig, StorageConfig, ValidationResult, WeatherConfig,
};
pub use error::{AppError, ConfigError, DeviceError, NetworkError, ReqwestErrorExt, WeatherError};

use anyhow::Result;

/// Initialize logging. `RUST_LOG` overrides the default `info` filter.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Compact Info core initialized");
    Ok(())
}
