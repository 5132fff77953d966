//! Service configuration

use crate::{Error, Result};
use fanout::SubscriberConfig;
use serde::{Deserialize, Serialize};

/// Room service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name
    pub service_name: String,

    /// Service version
    pub version: String,

    /// Ledger store
    pub ledger: ledger_core::Config,

    /// Subscriber delivery
    pub subscribers: SubscriberConfig,

    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "room-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: ledger_core::Config::default(),
            subscribers: SubscriberConfig::default(),
            log_json: false,
        }
    }
}

impl ServiceConfig {
    /// Load from TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ServiceConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.apply_env()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = ServiceConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        self.ledger.apply_env()?;
        self.subscribers.apply_env()?;

        if let Ok(json) = std::env::var("ROOM_LOG_JSON") {
            self.log_json = matches!(json.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }
}
