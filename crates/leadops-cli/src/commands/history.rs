//! `leadops history`
//!
//! Reads the audit file directly, so it works even when logging is
//! disabled for the current configuration.

use leadops_audit::{AuditEvent, AuditFilter, AuditStorage, FileStorage};
use leadops_core::LeadopsConfig;
use std::path::Path;

use super::print_json;

pub async fn run(config: &LeadopsConfig, filter: AuditFilter, json: bool) -> anyhow::Result<()> {
    let events = load(Path::new(&config.audit.file_path), filter).await?;

    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No audit events in {}", config.audit.file_path);
        return Ok(());
    }
    for event in &events {
        println!("{}", event.to_log_line());
    }
    Ok(())
}

async fn load(path: &Path, filter: AuditFilter) -> anyhow::Result<Vec<AuditEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let storage = FileStorage::new(path)?;
    Ok(storage.query(filter).await?)
}
