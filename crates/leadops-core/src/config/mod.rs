//! Configuration types for leadops.
//!
//! Configuration is read from a single YAML file (`leadops.yaml` by
//! default). Every section is optional; secrets are normally supplied
//! through environment variables named in the file.
//!
//! ```yaml
//! project: crm-prod
//! upstream:
//!   database_url_env: SUPABASE_DB_URL
//! gateway:
//!   base_url: https://evolution.example.com
//!   api_key_env: EVOLUTION_API_KEY
//! reconcile:
//!   identity_key: user_id
//!   default_role: owner
//! audit:
//!   backend: file
//!   file_path: leadops-audit.jsonl
//! ```

pub mod audit;
pub mod gateway;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use audit::{AuditConfig, StorageBackend};
pub use gateway::GatewayConfig;
pub use upstream::{ConnectionPoolConfig, SslMode, UpstreamConfig};

use crate::model::{IdentityKey, MemberRole};
use crate::reconcile::ReconcileOptions;

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "leadops.yaml";

/// Complete leadops configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadopsConfig {
    /// Project name, logged when the configuration loads.
    #[serde(default)]
    pub project: Option<String>,

    /// Supabase Postgres connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// WhatsApp gateway.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Membership reconciliation defaults.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Membership reconciliation defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileConfig {
    /// Column of `profiles` stored in `workspace_members.user_id`.
    #[serde(default)]
    pub identity_key: IdentityKey,

    /// Role for memberships created by repair.
    #[serde(default)]
    pub default_role: MemberRole,
}

impl ReconcileConfig {
    pub fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            identity_key: self.identity_key,
            default_role: self.default_role,
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LeadopsConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content. An empty document yields defaults.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load `path` if given, otherwise `leadops.yaml` from `dir` when it
    /// exists, otherwise defaults.
    pub fn load(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    Self::from_file(candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = LeadopsConfig::from_yaml("").unwrap();
        assert_eq!(config.reconcile.identity_key, IdentityKey::UserId);
        assert_eq!(config.reconcile.default_role, MemberRole::Owner);
        assert_eq!(config.gateway.timeout_seconds, 15);
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
project: crm-prod
upstream:
  database_url: postgresql://postgres:pw@db.x.supabase.co:5432/postgres
  ssl_mode: require
gateway:
  base_url: https://evo.example.com
  timeout_seconds: 5
reconcile:
  identity_key: profile_id
  default_role: seller
audit:
  backend: dual
  file_path: /tmp/audit.jsonl
"#;
        let config = LeadopsConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project.as_deref(), Some("crm-prod"));
        assert_eq!(config.upstream.ssl_mode, SslMode::Require);
        assert_eq!(config.gateway.timeout_seconds, 5);
        assert_eq!(config.reconcile.identity_key, IdentityKey::ProfileId);
        assert_eq!(config.reconcile.default_role, MemberRole::Seller);
        assert_eq!(config.audit.backend, StorageBackend::Dual);
        assert_eq!(config.audit.file_path, "/tmp/audit.jsonl");
    }

    #[test]
    fn test_example_file_parses() {
        let yaml = include_str!("../../../../leadops.example.yaml");
        let config = LeadopsConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project.as_deref(), Some("crm-production"));
        assert_eq!(config.upstream.pool.max_connections, 2);
        assert_eq!(config.audit.backend, StorageBackend::File);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let yaml = "reconcile:\n  default_role: viewer\n";
        assert!(matches!(
            LeadopsConfig::from_yaml(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        writeln!(f, "project: from-dir").unwrap();

        let config = LeadopsConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.project.as_deref(), Some("from-dir"));
    }

    #[test]
    fn test_load_missing_dir_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = LeadopsConfig::load(None, dir.path()).unwrap();
        assert!(config.project.is_none());
    }

    #[test]
    fn test_load_explicit_missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            LeadopsConfig::load(Some(&missing), dir.path()),
            Err(ConfigError::Io(_))
        ));
    }
}
