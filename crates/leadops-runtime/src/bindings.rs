use crate::adapter::{GatewayClient, TenantStore};
use leadops_audit::AuditLogger;
use leadops_core::{BindingReport, audit_bindings, claims_from};

/// Fetch both sides and partition them. Read-only.
pub async fn audit_gateway_bindings<S, G>(
    store: &S,
    gateway: &G,
    audit: &AuditLogger,
) -> anyhow::Result<BindingReport>
where
    S: TenantStore + ?Sized,
    G: GatewayClient + ?Sized,
{
    let instances = gateway.fetch_instances().await?;
    let workspaces = store.list_workspaces().await?;
    let connections = store.list_connections().await?;
    tracing::info!(
        instances = instances.len(),
        workspaces = workspaces.len(),
        connections = connections.len(),
        "Auditing gateway bindings"
    );

    let claims = claims_from(&workspaces, &connections);
    let report = audit_bindings(&instances, &claims);

    for orphan in &report.orphaned_instances {
        tracing::warn!(instance = %orphan.instance_name, "Gateway instance claimed by no workspace");
    }
    for ws in &report.disconnected_workspaces {
        tracing::warn!(
            workspace = %ws.workspace_name,
            instance = ws.instance_name.as_deref().unwrap_or("-"),
            reason = ?ws.reason,
            "Workspace not bound to a gateway instance"
        );
    }
    for conflict in &report.conflicting_claims {
        tracing::warn!(
            instance = %conflict.instance_name,
            workspaces = conflict.workspace_ids.len(),
            "Instance claimed by several workspaces"
        );
    }
    for multi in &report.multi_instance_workspaces {
        tracing::warn!(
            workspace = %multi.workspace_name,
            instances = %multi.instance_names.join(","),
            "Workspace claims several instances"
        );
    }

    audit.log_binding_audit(&report).await?;
    Ok(report)
}
