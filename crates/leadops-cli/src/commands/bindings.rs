//! `leadops audit-bindings`

use std::fmt::Write as _;

use leadops_core::{BindingReport, DisconnectReason, LeadopsConfig};
use leadops_gateway::EvolutionClient;
use leadops_runtime::audit_gateway_bindings;

use super::{connect_store, open_audit, print_json};

pub async fn run(config: &LeadopsConfig, json: bool, strict: bool) -> anyhow::Result<()> {
    let gateway = EvolutionClient::from_config(&config.gateway)?;
    let store = connect_store(config).await?;
    let audit = open_audit(config)?;

    let report = audit_gateway_bindings(&store, &gateway, &audit).await?;

    if json {
        print_json(&report)?;
    } else {
        print!("{}", render(&report));
    }

    if strict && !report.is_consistent() {
        anyhow::bail!(
            "binding audit found {} orphaned instance(s), {} disconnected workspace(s), {} conflict(s), {} workspace(s) with several instances",
            report.orphaned_instances.len(),
            report.disconnected_workspaces.len(),
            report.conflicting_claims.len(),
            report.multi_instance_workspaces.len()
        );
    }
    Ok(())
}

pub fn render(report: &BindingReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Bound ({}):", report.bound.len());
    for b in &report.bound {
        let _ = writeln!(
            out,
            "  ✓ {} ↔ {} [{}]",
            b.instance_name,
            b.workspace_name,
            b.status.as_deref().unwrap_or("unknown")
        );
    }

    if !report.orphaned_instances.is_empty() {
        let _ = writeln!(out, "\nOrphaned instances ({}):", report.orphaned_instances.len());
        for o in &report.orphaned_instances {
            let _ = writeln!(
                out,
                "  ⚠ {} [{}]",
                o.instance_name,
                o.status.as_deref().unwrap_or("unknown")
            );
        }
    }

    if !report.disconnected_workspaces.is_empty() {
        let _ = writeln!(
            out,
            "\nDisconnected workspaces ({}):",
            report.disconnected_workspaces.len()
        );
        for d in &report.disconnected_workspaces {
            let reason = match (d.reason, d.instance_name.as_deref()) {
                (DisconnectReason::MissingAtGateway, Some(name)) => {
                    format!("claims '{}', not found at gateway", name)
                }
                (DisconnectReason::MissingAtGateway, None) => "not found at gateway".to_string(),
                (DisconnectReason::NoInstanceName, _) => "no instance configured".to_string(),
            };
            let _ = writeln!(out, "  ⚠ {} ({}): {}", d.workspace_name, d.workspace_id, reason);
        }
    }

    if !report.conflicting_claims.is_empty() {
        let _ = writeln!(out, "\nConflicting claims ({}):", report.conflicting_claims.len());
        for c in &report.conflicting_claims {
            let _ = writeln!(
                out,
                "  ✗ {} claimed by {} workspaces{}",
                c.instance_name,
                c.workspace_ids.len(),
                if c.at_gateway { "" } else { " (not at gateway)" }
            );
        }
    }

    if !report.multi_instance_workspaces.is_empty() {
        let _ = writeln!(
            out,
            "\nWorkspaces with several instances ({}):",
            report.multi_instance_workspaces.len()
        );
        for m in &report.multi_instance_workspaces {
            let _ = writeln!(
                out,
                "  ⚠ {} ({}): {}",
                m.workspace_name,
                m.workspace_id,
                m.instance_names.join(", ")
            );
        }
    }

    let _ = writeln!(out);
    if report.is_consistent() {
        let _ = writeln!(out, "✅ Every instance is bound to exactly one workspace.");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadops_core::{GatewayInstance, WorkspaceClaim, audit_bindings};
    use uuid::Uuid;

    #[test]
    fn test_render_sections() {
        let instances = vec![
            GatewayInstance {
                name: "acme".to_string(),
                status: Some("open".to_string()),
                owner_jid: None,
                profile_name: None,
            },
            GatewayInstance {
                name: "stray".to_string(),
                status: None,
                owner_jid: None,
                profile_name: None,
            },
        ];
        let claims = vec![
            WorkspaceClaim {
                workspace_id: Uuid::new_v4(),
                workspace_name: "Acme".to_string(),
                instance_names: vec!["acme".to_string()],
            },
            WorkspaceClaim {
                workspace_id: Uuid::new_v4(),
                workspace_name: "Beta".to_string(),
                instance_names: vec!["beta".to_string()],
            },
        ];

        let text = render(&audit_bindings(&instances, &claims));
        assert!(text.contains("✓ acme ↔ Acme [open]"));
        assert!(text.contains("⚠ stray [unknown]"));
        assert!(text.contains("claims 'beta', not found at gateway"));
        assert!(!text.contains("✅"));
        assert!(!text.contains("several instances"));
    }

    #[test]
    fn test_render_multi_instance_workspace() {
        let instances: Vec<GatewayInstance> = ["alpha", "zeta"]
            .iter()
            .map(|name| GatewayInstance {
                name: name.to_string(),
                status: Some("open".to_string()),
                owner_jid: None,
                profile_name: None,
            })
            .collect();
        let claims = vec![WorkspaceClaim {
            workspace_id: Uuid::nil(),
            workspace_name: "Acme".to_string(),
            instance_names: vec!["alpha".to_string(), "zeta".to_string()],
        }];

        let text = render(&audit_bindings(&instances, &claims));
        assert!(text.contains("Workspaces with several instances (1):"));
        assert!(text.contains(&format!("⚠ Acme ({}): alpha, zeta", Uuid::nil())));
        assert!(!text.contains("Orphaned instances"));
        assert!(!text.contains("✅"));
    }
}
