//! Subcommand implementations for the `leadops` binary.

pub mod bindings;
pub mod check;
pub mod ensure;
pub mod history;
pub mod inspect;
pub mod reconcile;

use anyhow::Context;
use leadops_adapter_pg::PostgresStore;
use leadops_audit::AuditLogger;
use leadops_core::LeadopsConfig;
use serde::Serialize;
use std::path::Path;

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LeadopsConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let config = LeadopsConfig::load(path, &cwd).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    tracing::info!(
        project = config.project.as_deref().unwrap_or("-"),
        identity_key = %config.reconcile.identity_key,
        "Loaded configuration"
    );
    Ok(config)
}

pub async fn connect_store(config: &LeadopsConfig) -> anyhow::Result<PostgresStore> {
    PostgresStore::connect(&config.upstream).await
}

pub fn open_audit(config: &LeadopsConfig) -> anyhow::Result<AuditLogger> {
    let audit = AuditLogger::new(&config.audit).context("Failed to open audit log")?;
    tracing::debug!(run_id = %audit.run_id(), enabled = audit.is_enabled(), "Audit log ready");
    Ok(audit)
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "project: crm-staging\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.project.as_deref(), Some("crm-staging"));
    }

    #[test]
    fn test_load_config_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("absent.yaml"));
    }
}
