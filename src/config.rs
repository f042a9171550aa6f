//! Layered configuration loading using figment.
//!
//! Sources, highest priority first:
//! 1. `GOOGLE_API_KEY` / `MISTRAL_API_KEY` for provider credentials
//! 2. Environment variables (`SITESCORE_*` prefix, `__` separates sections)
//! 3. `sitescore.toml` (or the file named by `SITESCORE_CONFIG`)
//! 4. Built-in defaults
//!
//! `SITESCORE_BACKEND__PROVIDER=mistral` maps to `backend.provider`,
//! `SITESCORE_FETCH__TIMEOUT_SECS=10` to `fetch.timeout_secs`, and so on.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::site::SiteConfig;

pub const CONFIG_PATH_ENV: &str = "SITESCORE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "sitescore.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://sitescore.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Registered backend name; blank selects the default.
    pub provider: String,
    pub timeout_secs: u64,
    pub gemini: GeminiSettings,
    pub mistral: MistralSettings,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            timeout_secs: 60,
            gemini: GeminiSettings::default(),
            mistral: MistralSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://generativelanguage.googleapis.com/v1beta/models/".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.1,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MistralSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for MistralSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.mistral.ai/v1/chat/completions".to_string(),
            model: "mistral-large-latest".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("sitescore/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Serialize concurrent runs for the same (page, language) key.
    pub single_flight: bool,
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        Self::figment()
            .extract()
            .map_err(|e| AppError::configuration(format!("Invalid configuration: {}", e)))
    }

    /// Build the figment provider chain.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let path = Self::config_path();
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("SITESCORE_").ignore(&["CONFIG"]).split("__"))
            .merge(
                Env::raw()
                    .only(&["GOOGLE_API_KEY"])
                    .map(|_| "backend.gemini.api_key".into()),
            )
            .merge(
                Env::raw()
                    .only(&["MISTRAL_API_KEY"])
                    .map(|_| "backend.mistral.api_key".into()),
            )
    }

    fn config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_files() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load().expect("defaults load");
            assert_eq!(settings.server.bind, "127.0.0.1:8080");
            assert_eq!(settings.backend.provider, "gemini");
            assert_eq!(settings.backend.timeout_secs, 60);
            assert_eq!(settings.fetch.timeout_secs, 30);
            assert!(!settings.analysis.single_flight);
            assert!(settings.backend.gemini.api_key.is_none());
            assert_eq!(settings.site.languages.len(), 1);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sitescore.toml",
                r#"
                [backend]
                provider = "mistral"

                [backend.mistral]
                api_key = "from-file"

                [site]
                base_url = "https://example.com"

                [[site.pages]]
                id = 1
                slug = ""
                keyword = "coffee"
                "#,
            )?;
            jail.set_env("SITESCORE_FETCH__TIMEOUT_SECS", "5");

            let settings = Settings::load().expect("config loads");
            assert_eq!(settings.backend.provider, "mistral");
            assert_eq!(settings.backend.mistral.api_key.as_deref(), Some("from-file"));
            assert_eq!(settings.fetch.timeout_secs, 5);
            assert_eq!(settings.site.pages[0].keyword.as_deref(), Some("coffee"));
            Ok(())
        });
    }

    #[test]
    fn test_provider_key_env_wins_over_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [backend.gemini]
                api_key = "from-file"
                "#,
            )?;
            jail.set_env(CONFIG_PATH_ENV, "custom.toml");
            jail.set_env("GOOGLE_API_KEY", "from-env");

            let settings = Settings::load().expect("config loads");
            assert_eq!(settings.backend.gemini.api_key.as_deref(), Some("from-env"));
            Ok(())
        });
    }
}
