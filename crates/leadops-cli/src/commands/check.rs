//! `leadops check`
//!
//! Prints the resolved configuration with secrets masked and reports
//! anything that would stop the other commands from running. With
//! `--connect` it also verifies the tables the store reads.

use leadops_adapter_pg::schema::check_schema;
use leadops_core::config::StorageBackend;
use leadops_core::LeadopsConfig;

use super::connect_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    pub category: &'static str,
    pub message: String,
}

impl CheckFinding {
    fn new(severity: Severity, category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
        }
    }
}

pub async fn run(config: &LeadopsConfig, connect: bool) -> anyhow::Result<()> {
    println!("🔍 Checking leadops configuration...\n");

    let mut findings = check_config(config);

    if connect {
        println!("  🔌 Connecting to database...");
        match connect_store(config).await {
            Ok(store) => match check_schema(store.pool()).await {
                Ok(schema) => {
                    findings.push(CheckFinding::new(
                        Severity::Info,
                        "database",
                        format!("connected: {}", schema.server_version),
                    ));
                    for table in &schema.missing_tables {
                        findings.push(CheckFinding::new(
                            Severity::Error,
                            "database",
                            format!("missing table '{}'", table),
                        ));
                    }
                    for column in &schema.missing_columns {
                        findings.push(CheckFinding::new(
                            Severity::Error,
                            "database",
                            format!("missing column '{}'", column),
                        ));
                    }
                }
                Err(e) => findings.push(CheckFinding::new(
                    Severity::Error,
                    "database",
                    format!("schema check failed: {:#}", e),
                )),
            },
            Err(e) => findings.push(CheckFinding::new(
                Severity::Error,
                "database",
                format!("{:#}", e),
            )),
        }
    }

    print_findings(&findings);

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("configuration check failed with {} error(s)", errors);
    }
    Ok(())
}

pub fn check_config(config: &LeadopsConfig) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    let upstream = &config.upstream;

    let env_url = upstream
        .database_url_env
        .as_deref()
        .filter(|var| std::env::var(var).is_ok());
    let source = match (env_url, &upstream.database_url) {
        (Some(var), _) => format!("${}", var),
        (None, Some(_)) => "upstream.database_url".to_string(),
        (None, None) => "upstream.host/port/database".to_string(),
    };
    findings.push(CheckFinding::new(
        Severity::Info,
        "database",
        format!(
            "{} (from {})",
            upstream.redacted_connection_string(),
            source
        ),
    ));
    if env_url.is_none() && upstream.database_url.is_none() && upstream.host == "localhost" {
        findings.push(CheckFinding::new(
            Severity::Warning,
            "database",
            format!(
                "no database URL configured; falling back to localhost (set ${})",
                upstream.database_url_env.as_deref().unwrap_or("SUPABASE_DB_URL")
            ),
        ));
    }

    match config.gateway.resolve_base_url() {
        Ok(url) => findings.push(CheckFinding::new(Severity::Info, "gateway", url)),
        Err(e) => findings.push(CheckFinding::new(
            Severity::Warning,
            "gateway",
            format!("{} (needed by audit-bindings)", e),
        )),
    }
    match config.gateway.resolve_api_key() {
        Ok(key) => findings.push(CheckFinding::new(
            Severity::Info,
            "gateway",
            format!("api key {}", mask_secret(&key)),
        )),
        Err(e) => findings.push(CheckFinding::new(
            Severity::Warning,
            "gateway",
            format!("{} (needed by audit-bindings)", e),
        )),
    }

    let reconcile = &config.reconcile;
    findings.push(CheckFinding::new(
        Severity::Info,
        "reconcile",
        format!(
            "identity key {}, default role {}",
            reconcile.identity_key, reconcile.default_role
        ),
    ));

    let audit = &config.audit;
    if !audit.enabled {
        findings.push(CheckFinding::new(
            Severity::Warning,
            "audit",
            "audit logging is disabled; repairs leave no trail",
        ));
    } else {
        let target = match audit.backend {
            StorageBackend::Console => "stderr".to_string(),
            StorageBackend::File => audit.file_path.clone(),
            StorageBackend::Dual => format!("{} + stderr", audit.file_path),
        };
        findings.push(CheckFinding::new(Severity::Info, "audit", target));
        if audit.backend != StorageBackend::Console && audit.file_path.trim().is_empty() {
            findings.push(CheckFinding::new(
                Severity::Error,
                "audit",
                "audit.file_path is empty",
            ));
        }
    }

    findings
}

/// Keep the first four characters of secrets longer than eight.
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "****".to_string();
    }
    let head: String = secret.chars().take(4).collect();
    format!("{}****", head)
}

fn print_findings(findings: &[CheckFinding]) {
    for f in findings {
        let icon = match f.severity {
            Severity::Info => "ℹ",
            Severity::Warning => "⚠",
            Severity::Error => "✗",
        };
        println!("  {} [{}] {}", icon, f.category, f.message);
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    let warnings = findings
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .count();

    println!();
    println!("{}", "═".repeat(60));
    if errors == 0 && warnings == 0 {
        println!("✅ All checks passed!");
    } else {
        println!("Summary: {} error(s), {} warning(s)", errors, warnings);
    }
}
