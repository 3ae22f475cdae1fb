//! Typed view of the merged configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub notify: NotifyConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Name of the env var holding the connection URL.
    pub url_env: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Per-subscriber queue bound.
    pub channel_capacity: usize,
    pub keepalive_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8899".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "HHR_DATABASE_URL".to_string(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            keepalive_secs: 15,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl ApiConfig {
    /// Requested page size, defaulted and clamped to `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

impl DeskConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: DeskConfig = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the desk schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.addr.trim().is_empty() {
            bail!("server.addr must not be empty");
        }
        if self.database.url_env.trim().is_empty() {
            bail!("database.url_env must name an env var");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be > 0");
        }
        if self.notify.channel_capacity == 0 {
            bail!("notify.channel_capacity must be > 0");
        }
        if self.notify.keepalive_secs == 0 {
            bail!("notify.keepalive_secs must be > 0");
        }
        if self.api.max_page_size == 0 {
            bail!("api.max_page_size must be > 0");
        }
        if self.api.default_page_size == 0 || self.api.default_page_size > self.api.max_page_size {
            bail!(
                "api.default_page_size must be within 1..={}",
                self.api.max_page_size
            );
        }
        Ok(())
    }

    /// Apply an `HHR_DAEMON_ADDR`-style override.
    pub fn with_addr_override(mut self, addr: Option<String>) -> Self {
        if let Some(a) = addr.filter(|a| !a.trim().is_empty()) {
            self.server.addr = a;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn empty_config_yields_defaults() {
        let loaded = load_layered_yaml_from_strings(&[]).unwrap();
        assert_eq!(DeskConfig::from_loaded(&loaded).unwrap(), DeskConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let loaded = load_layered_yaml_from_strings(&["notify:\n  keepalive_secs: 5\n"]).unwrap();
        let cfg = DeskConfig::from_loaded(&loaded).unwrap();
        assert_eq!(cfg.notify.keepalive_secs, 5);
        assert_eq!(cfg.notify.channel_capacity, 64);
        assert_eq!(cfg.api, ApiConfig::default());
    }

    #[test]
    fn invalid_page_sizes_rejected() {
        let loaded = load_layered_yaml_from_strings(&[
            "api:\n  default_page_size: 500\n  max_page_size: 100\n",
        ])
        .unwrap();
        assert!(DeskConfig::from_loaded(&loaded).is_err());
    }

    #[test]
    fn page_size_clamps() {
        let api = ApiConfig::default();
        assert_eq!(api.page_size(None), 10);
        assert_eq!(api.page_size(Some(0)), 1);
        assert_eq!(api.page_size(Some(1000)), 100);
        assert_eq!(api.page_size(Some(25)), 25);
    }

    #[test]
    fn addr_override() {
        let cfg = DeskConfig::default().with_addr_override(Some("0.0.0.0:9000".into()));
        assert_eq!(cfg.server.addr, "0.0.0.0:9000");
        let cfg = DeskConfig::default().with_addr_override(Some("  ".into()));
        assert_eq!(cfg.server.addr, "127.0.0.1:8899");
    }
}
