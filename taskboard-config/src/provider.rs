//! Configuration provider using Figment

use crate::error::{ConfigError, ConfigResult};
use crate::types::SyncConfig;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "TASKBOARD_";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (.toml extension)
    Toml,
    /// YAML format (.yaml or .yml extensions)
    Yaml,
    /// JSON format (.json extension)
    Json,
}

impl ConfigFormat {
    /// Determine the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determine the format from a path
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| ConfigError::UnsupportedFormat {
            format: ext.to_string(),
        })
    }
}

/// Configuration provider
///
/// Configuration is read fresh on every [`load`](Self::load); nothing is cached.
#[derive(Debug, Default)]
pub struct ConfigProvider {
    file: Option<PathBuf>,
}

impl ConfigProvider {
    /// Create a provider that reads defaults and environment only
    pub fn new() -> Self {
        Self { file: None }
    }

    /// Add a configuration file layered between defaults and environment
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Load and validate the configuration
    pub fn load(&self) -> ConfigResult<SyncConfig> {
        let config: SyncConfig = self.build_figment()?.extract()?;
        config.validate()?;
        debug!(
            min_distance_px = config.drag.min_distance_px,
            max_buffered_events = config.reconciler.max_buffered_events,
            "loaded sync configuration"
        );
        Ok(config)
    }

    /// Build the figment with all sources in precedence order
    fn build_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(SyncConfig::default()));

        if let Some(path) = &self.file {
            figment = figment.merge(Self::load_config_file(path)?);
        }

        trace!("Merging {}* environment overrides", ENV_PREFIX);
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load a single configuration file based on its extension
    fn load_config_file(path: &Path) -> ConfigResult<Figment> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        trace!("Loading config file: {}", path.display());
        Ok(match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => Figment::from(Toml::file(path)),
            ConfigFormat::Yaml => Figment::from(Yaml::file(path)),
            ConfigFormat::Json => Figment::from(Json::file(path)),
        })
    }
}
