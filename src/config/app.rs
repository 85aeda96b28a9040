use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_PROXY_HOSTS: &[&str] = &["firebasestorage.googleapis.com", "storage.googleapis.com"];
const DEFAULT_PROXY_MAX_BYTES: u64 = 20 * 1024 * 1024;
const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 3;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Runtime configuration read from `oohdesk.toml` in the data directory,
/// with credentials overridable through environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub integrations: IntegrationsConfig,
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub algolia: Option<AlgoliaConfig>,
    pub resend: Option<ResendConfig>,
    pub google_maps: Option<GoogleMapsConfig>,
    pub accuweather: Option<AccuWeatherConfig>,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlgoliaConfig {
    pub app_id: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl AlgoliaConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-dsn.algolia.net", self.app_id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ResendConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "https://api.resend.com".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleMapsConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl GoogleMapsConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "https://maps.googleapis.com".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccuWeatherConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl AccuWeatherConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "https://dataservice.accuweather.com".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub allowed_hosts: Vec<String>,
    pub max_bytes: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: DEFAULT_PROXY_HOSTS.iter().map(|h| h.to_string()).collect(),
            max_bytes: DEFAULT_PROXY_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub low_stock_threshold: i64,
    pub sweep_interval_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl AppConfig {
    /// Loads the config file from `path` when it exists, then overlays the
    /// process environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Overlays values from `lookup` (normally the process environment).
    /// A credential only enables an integration when all of its required
    /// values are present, either from the file or from the lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let integrations = &mut self.integrations;

        let algolia_id = lookup("ALGOLIA_APP_ID");
        let algolia_key = lookup("ALGOLIA_API_KEY");
        match integrations.algolia.as_mut() {
            Some(algolia) => {
                if let Some(id) = algolia_id {
                    algolia.app_id = id;
                }
                if let Some(key) = algolia_key {
                    algolia.api_key = key;
                }
            }
            None => {
                if let (Some(app_id), Some(api_key)) = (algolia_id, algolia_key) {
                    integrations.algolia = Some(AlgoliaConfig {
                        app_id,
                        api_key,
                        base_url: None,
                    });
                }
            }
        }

        let resend_key = lookup("RESEND_API_KEY");
        let resend_from = lookup("RESEND_FROM_EMAIL");
        match integrations.resend.as_mut() {
            Some(resend) => {
                if let Some(key) = resend_key {
                    resend.api_key = key;
                }
                if let Some(from) = resend_from {
                    resend.from = from;
                }
            }
            None => {
                if let (Some(api_key), Some(from)) = (resend_key, resend_from) {
                    integrations.resend = Some(ResendConfig {
                        api_key,
                        from,
                        base_url: None,
                    });
                }
            }
        }

        if let Some(api_key) = lookup("GOOGLE_MAPS_API_KEY") {
            match integrations.google_maps.as_mut() {
                Some(maps) => maps.api_key = api_key,
                None => {
                    integrations.google_maps = Some(GoogleMapsConfig {
                        api_key,
                        base_url: None,
                    })
                }
            }
        }

        if let Some(api_key) = lookup("ACCUWEATHER_API_KEY") {
            match integrations.accuweather.as_mut() {
                Some(weather) => weather.api_key = api_key,
                None => {
                    integrations.accuweather = Some(AccuWeatherConfig {
                        api_key,
                        base_url: None,
                    })
                }
            }
        }

        if let Some(hosts) = lookup("OOHDESK_PROXY_ALLOWED_HOSTS") {
            integrations.proxy.allowed_hosts = hosts
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
        }

        if let Some(threshold) = lookup("OOHDESK_LOW_STOCK_THRESHOLD") {
            self.inventory.low_stock_threshold = threshold.trim().parse().map_err(|_| {
                Error::Config(format!("OOHDESK_LOW_STOCK_THRESHOLD is not a number: {threshold}"))
            })?;
        }

        if self.inventory.low_stock_threshold < 0 {
            return Err(Error::Config(
                "low_stock_threshold cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig::from_file(&temp.path().join("missing.toml")).unwrap();

        assert!(config.integrations.algolia.is_none());
        assert_eq!(config.inventory.low_stock_threshold, 3);
        assert!(
            config
                .integrations
                .proxy
                .allowed_hosts
                .contains(&"firebasestorage.googleapis.com".to_string())
        );
    }

    #[test]
    fn test_toml_sections() {
        let config = AppConfig::from_toml(
            r#"
            [integrations.resend]
            api_key = "re_123"
            from = "sales@example.com"

            [inventory]
            low_stock_threshold = 5
            "#,
        )
        .unwrap();

        let resend = config.integrations.resend.unwrap();
        assert_eq!(resend.from, "sales@example.com");
        assert_eq!(resend.base_url(), "https://api.resend.com");
        assert_eq!(config.inventory.low_stock_threshold, 5);
        assert_eq!(config.inventory.sweep_interval_secs, 60);
    }

    #[test]
    fn test_env_enables_integrations() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup_from(&[
                ("ALGOLIA_APP_ID", "APP"),
                ("ALGOLIA_API_KEY", "key"),
                ("GOOGLE_MAPS_API_KEY", "maps"),
                ("RESEND_API_KEY", "re_only_key"),
            ]))
            .unwrap();

        let algolia = config.integrations.algolia.unwrap();
        assert_eq!(algolia.base_url(), "https://APP-dsn.algolia.net");
        assert_eq!(config.integrations.google_maps.unwrap().api_key, "maps");
        // A sender address is required as well.
        assert!(config.integrations.resend.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml(
            r#"
            [integrations.accuweather]
            api_key = "file-key"
            base_url = "http://127.0.0.1:9000"
            "#,
        )
        .unwrap();
        config
            .apply_env(lookup_from(&[
                ("ACCUWEATHER_API_KEY", "env-key"),
                ("OOHDESK_PROXY_ALLOWED_HOSTS", "cdn.example.com, Media.Example.com"),
            ]))
            .unwrap();

        let weather = config.integrations.accuweather.unwrap();
        assert_eq!(weather.api_key, "env-key");
        assert_eq!(weather.base_url(), "http://127.0.0.1:9000");
        assert_eq!(
            config.integrations.proxy.allowed_hosts,
            vec!["cdn.example.com".to_string(), "media.example.com".to_string()]
        );
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(lookup_from(&[("OOHDESK_LOW_STOCK_THRESHOLD", "many")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
