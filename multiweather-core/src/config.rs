use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::ProviderId;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Overrides the provider's public endpoint, e.g. for a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-request timeout; defaults to [`DEFAULT_TIMEOUT_SECS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: None, timeout_secs: None }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Address the HTTP server binds to, e.g. "127.0.0.1:8080".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_addr: Option<String>,

    /// Example TOML:
    /// [providers.openweathermap]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    pub fn listen_addr_or_default(&self) -> &str {
        self.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Providers with credentials, in [`ProviderId::all`] order.
    pub fn configured_providers(&self) -> Vec<ProviderId> {
        ProviderId::all().iter().copied().filter(|id| self.is_provider_configured(*id)).collect()
    }

    /// Load config from the default location, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "multiweather", "multiweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key, keeping any endpoint overrides.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .and_modify(|cfg| cfg.api_key.clone_from(&api_key))
            .or_insert_with(|| ProviderConfig::new(api_key));
    }

    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some_and(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn empty_config_has_no_providers() {
        let cfg = Config::default();

        assert!(cfg.configured_providers().is_empty());
        assert_eq!(cfg.listen_addr_or_default(), DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OPEN_KEY".into());

        let key = cfg.provider_api_key(ProviderId::OpenWeatherMap);
        assert_eq!(key, Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::OpenWeatherMap));
        assert!(!cfg.is_provider_configured(ProviderId::WeatherUnderground));
    }

    #[test]
    fn upsert_keeps_endpoint_overrides() {
        let mut cfg = Config::default();
        cfg.providers.insert(
            "weatherunderground".into(),
            ProviderConfig {
                api_key: "OLD".into(),
                base_url: Some("http://localhost:9000".into()),
                timeout_secs: Some(3),
            },
        );

        cfg.upsert_provider_api_key(ProviderId::WeatherUnderground, "NEW".into());

        let provider = cfg.provider_config(ProviderId::WeatherUnderground).unwrap();
        assert_eq!(provider.api_key, "NEW");
        assert_eq!(provider.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(provider.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn blank_api_key_is_not_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "   ".into());

        assert!(!cfg.is_provider_configured(ProviderId::OpenWeatherMap));
    }

    #[test]
    fn configured_providers_follow_registry_order() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::WeatherUnderground, "WU".into());
        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OWM".into());

        assert_eq!(
            cfg.configured_providers(),
            vec![ProviderId::OpenWeatherMap, ProviderId::WeatherUnderground]
        );
    }

    #[test]
    fn parses_toml_with_optional_fields() {
        let cfg: Config = toml::from_str(
            r#"
            listen_addr = "127.0.0.1:3000"

            [providers.openweathermap]
            api_key = "abc"
            timeout_secs = 2

            [providers.weatherunderground]
            api_key = "def"
            base_url = "http://proxy.local"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.listen_addr_or_default(), "127.0.0.1:3000");
        let owm = cfg.provider_config(ProviderId::OpenWeatherMap).unwrap();
        assert_eq!(owm.timeout(), Duration::from_secs(2));
        assert!(owm.base_url.is_none());
        let wu = cfg.provider_config(ProviderId::WeatherUnderground).unwrap();
        assert_eq!(wu.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn save_and_load_round_trip_through_disk() {
        let path = std::env::temp_dir()
            .join(format!("multiweather-config-{}", std::process::id()))
            .join("config.toml");

        let mut cfg = Config { listen_addr: Some("127.0.0.1:9999".into()), ..Config::default() };
        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "KEY".into());
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.listen_addr.as_deref(), Some("127.0.0.1:9999"));
        assert_eq!(loaded.provider_api_key(ProviderId::OpenWeatherMap), Some("KEY"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn default_location_is_a_toml_file_in_the_project_dir() {
        // Platforms without a home directory have no default location.
        if let Ok(path) = Config::config_file_path() {
            assert!(path.ends_with("config.toml"));
            assert!(path.to_string_lossy().contains("multiweather"));
        }
    }

    #[test]
    fn missing_file_loads_as_default() {
        let path = std::env::temp_dir().join("multiweather-does-not-exist").join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(cfg.providers.is_empty());
    }
}
