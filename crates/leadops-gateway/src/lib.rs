//! Read-only client for the Evolution API.
//!
//! Only `GET /instance/fetchInstances` is used. Two response shapes are
//! accepted: the flat list returned by current gateway versions and the
//! older list of `{ "instance": { ... } }` wrappers.

use async_trait::async_trait;
use leadops_core::sanitize::sanitize_text_content;
use leadops_core::{ConfigError, GatewayConfig, GatewayInstance};
use leadops_runtime::GatewayClient;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Longest error body kept in [`GatewayError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Wrapped { instance: RawInstance },
    Flat(RawInstance),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstance {
    name: Option<String>,
    instance_name: Option<String>,
    connection_status: Option<String>,
    status: Option<String>,
    owner_jid: Option<String>,
    owner: Option<String>,
    profile_name: Option<String>,
}

impl RawInstance {
    fn into_instance(self) -> Option<GatewayInstance> {
        let name = self
            .name
            .or(self.instance_name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())?;
        Some(GatewayInstance {
            name,
            status: self.connection_status.or(self.status),
            owner_jid: self.owner_jid.or(self.owner),
            profile_name: self.profile_name,
        })
    }
}

/// Parse a `fetchInstances` body. Entries without a name are dropped.
pub fn parse_instances(body: &str) -> Result<Vec<GatewayInstance>, GatewayError> {
    let entries: Vec<RawEntry> =
        serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))?;

    let mut instances = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw = match entry {
            RawEntry::Wrapped { instance } => instance,
            RawEntry::Flat(raw) => raw,
        };
        match raw.into_instance() {
            Some(instance) => instances.push(instance),
            None => tracing::warn!("Skipping gateway instance without a name"),
        }
    }
    Ok(instances)
}

pub struct EvolutionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EvolutionClient {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = config.resolve_base_url()?;
        let api_key = config.resolve_api_key()?;
        Self::new(base_url, api_key, Duration::from_secs(config.timeout_seconds))
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub async fn list_instances(&self) -> Result<Vec<GatewayInstance>, GatewayError> {
        let url = format!("{}/instance/fetchInstances", self.base_url);
        tracing::debug!(url = %url, "Fetching gateway instances");

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let mut body = sanitize_text_content(&body);
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let instances = parse_instances(&body)?;
        tracing::debug!(count = instances.len(), "Fetched gateway instances");
        Ok(instances)
    }
}

#[async_trait]
impl GatewayClient for EvolutionClient {
    async fn fetch_instances(&self) -> anyhow::Result<Vec<GatewayInstance>> {
        Ok(self.list_instances().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_shape() {
        let body = r#"[
            {"name": "acme", "connectionStatus": "open", "ownerJid": "5511@s.whatsapp.net", "profileName": "Acme"},
            {"name": " beta ", "connectionStatus": "close"}
        ]"#;
        let instances = parse_instances(body).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].name, "acme");
        assert_eq!(instances[0].status.as_deref(), Some("open"));
        assert_eq!(instances[0].owner_jid.as_deref(), Some("5511@s.whatsapp.net"));
        assert_eq!(instances[1].name, "beta");
    }

    #[test]
    fn test_parse_wrapped_shape() {
        let body = r#"[{"instance": {"instanceName": "acme", "status": "open", "owner": "5511"}}]"#;
        let instances = parse_instances(body).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].name, "acme");
        assert_eq!(instances[0].status.as_deref(), Some("open"));
        assert_eq!(instances[0].owner_jid.as_deref(), Some("5511"));
    }

    #[test]
    fn test_parse_skips_nameless_entries() {
        let body = r#"[{"connectionStatus": "open"}, {"name": ""}, {"name": "ok"}]"#;
        let instances = parse_instances(body).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].name, "ok");
    }

    #[test]
    fn test_parse_rejects_non_list() {
        let err = parse_instances(r#"{"error": "nope"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn test_from_config_requires_url() {
        let config = GatewayConfig {
            base_url: None,
            base_url_env: None,
            api_key: Some("k".to_string()),
            api_key_env: None,
            timeout_seconds: 5,
        };
        let err = EvolutionClient::from_config(&config).err().unwrap();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[tokio::test]
    async fn test_fetch_sends_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/instance/fetchInstances")
            .match_header("apikey", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name": "acme", "connectionStatus": "open"}]"#)
            .create_async()
            .await;

        let client =
            EvolutionClient::new(format!("{}/", server.url()), "secret", Duration::from_secs(5))
                .unwrap();
        let instances = client.fetch_instances().await.unwrap();

        mock.assert_async().await;
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].name, "acme");
    }

    #[tokio::test]
    async fn test_fetch_maps_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/instance/fetchInstances")
            .with_status(401)
            .with_body("<h1>Unauthorized</h1>")
            .create_async()
            .await;

        let client = EvolutionClient::new(server.url(), "wrong", Duration::from_secs(5)).unwrap();
        match client.list_instances().await {
            Err(GatewayError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "Unauthorized");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }
}
