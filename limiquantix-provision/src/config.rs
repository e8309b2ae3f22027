//! Configuration for the provisioning configuration layer.
//!
//! Loaded from YAML with defaults for every field:
//! - Linux: `/etc/limiquantix/provision.yaml`

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use limiquantix_common::{init_logging, is_valid_level, LogOutput};

use crate::error::{ProvisionError, Result};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/limiquantix/provision.yaml";

/// First reported API version that sequences the cloud-init boot itself.
pub const DEFAULT_CLOUD_INIT_VERSION_THRESHOLD: &str = "3.5.5.0";

/// Log format options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl From<LogFormat> for LogOutput {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => LogOutput::Json,
            LogFormat::Pretty => LogOutput::Pretty,
        }
    }
}

/// Provisioning configuration loaded from YAML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Reported API version at or above which `boot_with_cloud_init` is set
    pub cloud_init_version_threshold: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (json, pretty)
    pub log_format: LogFormat,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            cloud_init_version_threshold: DEFAULT_CLOUD_INIT_VERSION_THRESHOLD.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl ProvisionConfig {
    /// Load configuration from the default path.
    pub fn load() -> AnyResult<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file is
    /// an error.
    pub fn load_from_path(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_valid_level(&self.log_level) {
            return Err(ProvisionError::InvalidConfig(format!(
                "log_level '{}' must be one of trace, debug, info, warn, error",
                self.log_level
            )));
        }

        let threshold = self.cloud_init_version_threshold.trim();
        let well_formed = !threshold.is_empty()
            && threshold
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !well_formed {
            return Err(ProvisionError::InvalidConfig(format!(
                "cloud_init_version_threshold '{}' must be a dotted numeric version",
                self.cloud_init_version_threshold
            )));
        }

        Ok(())
    }

    /// Install the global tracing subscriber with these settings.
    pub fn init_logging(&self) -> AnyResult<()> {
        init_logging(&self.log_level, self.log_format.into())
    }
}
