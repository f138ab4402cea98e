//! `leadops inspect`

use std::fmt::Write as _;

use anyhow::Context;
use leadops_core::{LeadopsConfig, WorkspaceSummary, claims_from};
use leadops_runtime::TenantStore;
use serde::Serialize;
use uuid::Uuid;

use super::{connect_store, print_json};

#[derive(Debug, Serialize)]
struct WorkspaceRow {
    id: Uuid,
    name: String,
    instance_names: Vec<String>,
}

pub async fn run_workspaces(config: &LeadopsConfig, json: bool) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let workspaces = store.list_workspaces().await?;
    let connections = store.list_connections().await?;

    let rows: Vec<WorkspaceRow> = claims_from(&workspaces, &connections)
        .into_iter()
        .map(|c| WorkspaceRow {
            id: c.workspace_id,
            name: c.workspace_name,
            instance_names: c.instance_names,
        })
        .collect();

    if json {
        return print_json(&rows);
    }

    println!("{:<38} {:<30} INSTANCE", "ID", "NAME");
    for row in &rows {
        let instances = if row.instance_names.is_empty() {
            "-".to_string()
        } else {
            row.instance_names.join(", ")
        };
        println!("{:<38} {:<30} {}", row.id, row.name, instances);
    }
    println!("\n{} workspace(s)", rows.len());
    Ok(())
}

pub async fn run_workspace(config: &LeadopsConfig, id: Uuid, json: bool) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let summary = store
        .workspace_summary(id)
        .await?
        .with_context(|| format!("workspace {} not found", id))?;

    if json {
        print_json(&summary)
    } else {
        print!("{}", render_summary(&summary));
        Ok(())
    }
}

fn render_summary(s: &WorkspaceSummary) -> String {
    let mut out = String::new();
    let ws = &s.workspace;
    let _ = writeln!(out, "{} ({})", ws.name, ws.id);
    let _ = writeln!(out, "{}", "─".repeat(60));
    if let Some(owner) = ws.owner_id {
        let _ = writeln!(out, "Owner:        {}", owner);
    }
    let _ = writeln!(
        out,
        "Instance:     {}",
        ws.evolution_instance_name.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "Leads:        {} ({} hot)",
        s.lead_count, s.hot_lead_count
    );
    match &s.subscription {
        Some(sub) => {
            let _ = writeln!(
                out,
                "Subscription: {} [{}]",
                sub.plan_id.as_deref().unwrap_or("-"),
                sub.status
            );
        }
        None => {
            let _ = writeln!(out, "Subscription: none");
        }
    }

    let _ = writeln!(out, "\nMembers ({}):", s.members.len());
    for m in &s.members {
        let _ = writeln!(out, "  {} {}", m.user_id, m.role);
    }

    let _ = writeln!(out, "\nProfiles pointing here ({}):", s.profiles.len());
    for p in &s.profiles {
        let has_row = p
            .user_id
            .is_some_and(|u| s.members.iter().any(|m| m.user_id == u));
        let mark = if has_row { "✓" } else { "✗" };
        let _ = writeln!(out, "  {} {}", mark, p.label());
    }

    let _ = writeln!(out, "\nConnections ({}):", s.connections.len());
    for c in &s.connections {
        let _ = writeln!(
            out,
            "  {} [{}]",
            c.instance_name,
            c.status.as_deref().unwrap_or("unknown")
        );
    }
    out
}
