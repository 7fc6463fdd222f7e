pub mod config;
pub mod error;

pub use config::{BreakerConfig, Config, EndpointConfig, RetryConfig, ValidationResult};
pub use error::ConfigError;

use anyhow::Result;

/// Initialize logging for the process.
///
/// Log output goes to stderr so that stdout only carries lookup results.
/// The filter is read from `RUST_LOG` and defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!("Skycast core initialized");
    Ok(())
}
