//! Gateway configuration loaded from TOML.

use crate::request::Purpose;
use anyhow::{Context, Result, bail, ensure};
use compact_str::CompactString;
use provider::ProviderConfig;
use relay::BufferConfig;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    time::Duration,
};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "promptgate.toml";

/// Top-level gateway configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Service-key authentication for the HTTP routes.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Duplex buffering bounds.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Purpose → provider routing.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Configured backend profiles.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Server configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8011,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted service keys. An empty list disables the check.
    pub service_keys: Vec<String>,
}

/// Duplex buffer configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum buffered messages per channel.
    pub max_buffer_size: usize,
    /// Seconds a buffered message is kept.
    pub message_ttl_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 50,
            message_ttl_secs: 3600,
        }
    }
}

impl RelayConfig {
    /// Registry buffer bounds.
    pub fn buffer(&self) -> BufferConfig {
        BufferConfig {
            max_len: self.max_buffer_size,
            ttl: Duration::from_secs(self.message_ttl_secs),
        }
    }
}

/// Provider routing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Provider used when a purpose has no explicit route.
    #[serde(default)]
    pub default: CompactString,
    /// Per-purpose provider overrides, keyed by purpose name.
    #[serde(default)]
    pub purposes: BTreeMap<CompactString, CompactString>,
}

impl RoutingConfig {
    /// Parse the purpose keys.
    pub fn routes(&self) -> Result<BTreeMap<Purpose, CompactString>> {
        self.purposes
            .iter()
            .map(|(purpose, name)| {
                let purpose = purpose
                    .parse::<Purpose>()
                    .with_context(|| format!("invalid routing purpose '{purpose}'"))?;
                Ok((purpose, name.clone()))
            })
            .collect()
    }
}

impl GatewayConfig {
    /// Parse a TOML string into a `GatewayConfig`, expanding environment
    /// variables first. The result is not validated.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = crate::utils::expand_env_vars(toml_str);
        let config: Self = toml::from_str(&expanded).context("invalid gateway configuration")?;
        Ok(config)
    }

    /// Load configuration from a file path. Relative credential store paths
    /// are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config = Self::from_toml(&content)?;
        if let Some(dir) = path.parent() {
            for provider in &mut config.providers {
                provider.credential.resolve_paths(dir);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check provider configs and routing targets.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.providers.is_empty(), "at least one provider is required");

        let mut names = BTreeSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !names.insert(provider.name.as_str()) {
                bail!("duplicate provider name '{}'", provider.name);
            }
        }

        ensure!(
            names.contains(self.routing.default.as_str()),
            "routing.default '{}' does not name a configured provider",
            self.routing.default
        );
        for (purpose, name) in self.routing.routes()? {
            ensure!(
                names.contains(name.as_str()),
                "route for {purpose} targets unknown provider '{name}'"
            );
        }
        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
