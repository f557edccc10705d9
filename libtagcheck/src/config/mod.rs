//! Configuration file.
//!
//! An optional YAML file layered over built-in defaults:
//!
//! ```yaml
//! network:
//!   timeout: 30
//! registry:
//!   mirrors:
//!     - https://mirror.gcr.io
//!   insecure:
//!     - registry.internal:5000
//! ```

use crate::client::ClientConfig;
use crate::endpoint::ServiceOptions;
use crate::error::{Result, TagCheckError};
use config::{Config as ConfigRs, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;


/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub registry: Registry,
}

impl Config {
    /// Parses a `Config` from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults(None)?.add_source(File::from_str(s, FileFormat::Yaml));
        Self::from_builder(builder, None)
    }

    /// Loads a `Config` from an optional file path.
    ///
    /// Without a path the defaults are returned. A given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let display = path.map(|p| p.display().to_string());
        let mut builder = Self::defaults(display.clone())?;

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        Self::from_builder(builder, display)
    }

    /// Registry options for endpoint lookup.
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            mirrors: self.registry.mirrors.clone(),
            insecure_registries: self.registry.insecure.clone(),
        }
    }

    /// HTTP client settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new().with_timeout(self.network.timeout)
    }

    fn defaults(
        path: Option<String>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = ConfigRs::try_from(&Config::default())
            .map_err(|e| config_error("Failed to build default configuration", path, e))?;
        Ok(ConfigRs::builder().add_source(defaults))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<String>,
    ) -> Result<Self> {
        let config: Self = builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| config_error("Failed to load configuration", path.clone(), e))?;

        if config.network.timeout == 0 {
            return Err(TagCheckError::config(
                "network.timeout must be greater than zero".to_string(),
                path,
            ));
        }

        Ok(config)
    }
}

fn config_error(message: &str, path: Option<String>, source: ConfigError) -> TagCheckError {
    TagCheckError::config_with_source(message.to_string(), path, source)
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    /// Per-request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

/// Registry endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Registry {
    /// Docker Hub mirrors, tried before `registry-1.docker.io`.
    #[serde(default)]
    pub mirrors: Vec<String>,

    /// Domains that may fall back to plain HTTP.
    #[serde(default)]
    pub insecure: Vec<String>,
}
