//! Gateway-instance ↔ workspace binding audit.
//!
//! Each instance at the WhatsApp gateway should be claimed by exactly one
//! workspace and each workspace should claim an instance the gateway knows.
//! [`audit_bindings`] partitions both sides; it never repairs anything.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::model::{GatewayInstance, WhatsAppConnection, Workspace};

/// A workspace and every instance name it claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceClaim {
    pub workspace_id: Uuid,
    pub workspace_name: String,
    /// Distinct trimmed names, sorted. Empty when nothing is claimed.
    pub instance_names: Vec<String>,
}

/// Build one claim per workspace from both claim sources.
///
/// `workspaces.evolution_instance_name` and every `whatsapp_connections`
/// row for the workspace contribute a name. Blank names are ignored.
pub fn claims_from(
    workspaces: &[Workspace],
    connections: &[WhatsAppConnection],
) -> Vec<WorkspaceClaim> {
    let mut by_workspace: BTreeMap<Uuid, BTreeSet<&str>> = BTreeMap::new();
    for c in connections {
        let name = c.instance_name.trim();
        if !name.is_empty() {
            by_workspace.entry(c.workspace_id).or_default().insert(name);
        }
    }

    workspaces
        .iter()
        .map(|w| {
            let mut names = by_workspace.remove(&w.id).unwrap_or_default();
            if let Some(explicit) = w
                .evolution_instance_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
            {
                names.insert(explicit);
            }

            WorkspaceClaim {
                workspace_id: w.id,
                workspace_name: w.name.clone(),
                instance_names: names.into_iter().map(str::to_string).collect(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundPair {
    pub instance_name: String,
    pub workspace_id: Uuid,
    pub workspace_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Exists at the gateway, no workspace claims it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedInstance {
    pub instance_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The claimed name is unknown to the gateway.
    MissingAtGateway,
    /// The workspace claims no instance at all.
    NoInstanceName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectedWorkspace {
    pub workspace_id: Uuid,
    pub workspace_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    pub reason: DisconnectReason,
}

/// A workspace claiming more than one distinct instance name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiInstanceWorkspace {
    pub workspace_id: Uuid,
    pub workspace_name: String,
    pub instance_names: Vec<String>,
}

/// One instance name claimed by several workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingClaim {
    pub instance_name: String,
    pub workspace_ids: Vec<Uuid>,
    pub at_gateway: bool,
}

/// Result of [`audit_bindings`]. Every list is sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BindingReport {
    pub bound: Vec<BoundPair>,
    pub orphaned_instances: Vec<OrphanedInstance>,
    pub disconnected_workspaces: Vec<DisconnectedWorkspace>,
    pub conflicting_claims: Vec<ConflictingClaim>,
    pub multi_instance_workspaces: Vec<MultiInstanceWorkspace>,
}

impl BindingReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_instances.is_empty()
            && self.disconnected_workspaces.is_empty()
            && self.conflicting_claims.is_empty()
            && self.multi_instance_workspaces.is_empty()
    }
}

/// Partition gateway instances and workspace claims.
pub fn audit_bindings(instances: &[GatewayInstance], claims: &[WorkspaceClaim]) -> BindingReport {
    // Gateway side, deduplicated by trimmed name. First status wins.
    let mut gateway: BTreeMap<String, Option<String>> = BTreeMap::new();
    for i in instances {
        let name = i.name.trim();
        if name.is_empty() {
            continue;
        }
        gateway
            .entry(name.to_string())
            .or_insert_with(|| i.status.clone());
    }

    let mut report = BindingReport::default();
    let mut claimed: BTreeMap<String, Vec<&WorkspaceClaim>> = BTreeMap::new();

    for claim in claims {
        let names: BTreeSet<&str> = claim
            .instance_names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();

        if names.is_empty() {
            report.disconnected_workspaces.push(DisconnectedWorkspace {
                workspace_id: claim.workspace_id,
                workspace_name: claim.workspace_name.clone(),
                instance_name: None,
                reason: DisconnectReason::NoInstanceName,
            });
            continue;
        }
        if names.len() > 1 {
            report
                .multi_instance_workspaces
                .push(MultiInstanceWorkspace {
                    workspace_id: claim.workspace_id,
                    workspace_name: claim.workspace_name.clone(),
                    instance_names: names.iter().map(|n| n.to_string()).collect(),
                });
        }
        for name in names {
            claimed.entry(name.to_string()).or_default().push(claim);
        }
    }

    for (name, owners) in &claimed {
        let at_gateway = gateway.get(name);

        if owners.len() > 1 {
            let mut workspace_ids: Vec<Uuid> = owners.iter().map(|c| c.workspace_id).collect();
            workspace_ids.sort();
            report.conflicting_claims.push(ConflictingClaim {
                instance_name: name.clone(),
                workspace_ids,
                at_gateway: at_gateway.is_some(),
            });
            continue;
        }

        let owner = owners[0];
        match at_gateway {
            Some(status) => report.bound.push(BoundPair {
                instance_name: name.clone(),
                workspace_id: owner.workspace_id,
                workspace_name: owner.workspace_name.clone(),
                status: status.clone(),
            }),
            None => report.disconnected_workspaces.push(DisconnectedWorkspace {
                workspace_id: owner.workspace_id,
                workspace_name: owner.workspace_name.clone(),
                instance_name: Some(name.clone()),
                reason: DisconnectReason::MissingAtGateway,
            }),
        }
    }

    for (name, status) in &gateway {
        if !claimed.contains_key(name) {
            report.orphaned_instances.push(OrphanedInstance {
                instance_name: name.clone(),
                status: status.clone(),
            });
        }
    }

    report.disconnected_workspaces.sort_by(|a, b| {
        (&a.workspace_name, a.workspace_id, &a.instance_name).cmp(&(
            &b.workspace_name,
            b.workspace_id,
            &b.instance_name,
        ))
    });
    report.multi_instance_workspaces.sort_by(|a, b| {
        (&a.workspace_name, a.workspace_id).cmp(&(&b.workspace_name, b.workspace_id))
    });

    report
}
