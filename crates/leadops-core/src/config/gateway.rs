//! WhatsApp gateway (Evolution API) configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Where the gateway lives and how to authenticate.
///
/// The API key is sent in the `apikey` header. As with the database URL,
/// `*_env` fields take precedence over literal values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL, e.g. `https://evolution.example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_base_url_env", skip_serializing_if = "Option::is_none")]
    pub base_url_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_env", skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_url_env: default_base_url_env(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the base URL without a trailing slash.
    pub fn resolve_base_url(&self) -> Result<String, ConfigError> {
        let url = resolve(&self.base_url_env, &self.base_url).ok_or_else(|| {
            ConfigError::Config(format!(
                "gateway base URL not set (gateway.base_url or ${})",
                self.base_url_env.as_deref().unwrap_or("EVOLUTION_API_URL")
            ))
        })?;
        Ok(url.trim_end_matches('/').to_string())
    }

    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        resolve(&self.api_key_env, &self.api_key).ok_or_else(|| {
            ConfigError::Config(format!(
                "gateway API key not set (gateway.api_key or ${})",
                self.api_key_env.as_deref().unwrap_or("EVOLUTION_API_KEY")
            ))
        })
    }
}

fn resolve(env_var: &Option<String>, literal: &Option<String>) -> Option<String> {
    if let Some(var) = env_var
        && let Ok(value) = std::env::var(var)
        && !value.trim().is_empty()
    {
        return Some(value.trim().to_string());
    }
    literal
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn default_base_url_env() -> Option<String> {
    Some("EVOLUTION_API_URL".to_string())
}

fn default_api_key_env() -> Option<String> {
    Some("EVOLUTION_API_KEY".to_string())
}

fn default_timeout_seconds() -> u64 {
    15
}
