//! Audit logging configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the repair audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Where events go.
    #[serde(default)]
    pub backend: StorageBackend,

    /// File path (for `file` and `dual`).
    #[serde(default = "default_file_path")]
    pub file_path: String,
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Human-readable lines on stderr.
    Console,
    /// JSON Lines appended to `file_path`.
    #[default]
    File,
    /// Both of the above.
    Dual,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: StorageBackend::default(),
            file_path: default_file_path(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_file_path() -> String {
    "leadops-audit.jsonl".to_string()
}
