//! Verify or repair one (user, workspace) membership.

use crate::adapter::TenantStore;
use leadops_audit::AuditLogger;
use leadops_core::sanitize::sanitize_email;
use leadops_core::{IdentityKey, MemberRole};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How the operator names the user: a raw identity or a profile email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(Uuid),
    Email(String),
}

impl FromStr for UserRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = Uuid::parse_str(s.trim()) {
            return Ok(Self::Id(id));
        }
        let email = sanitize_email(s);
        if email.is_empty() {
            return Err(format!("'{}' is neither a UUID nor a valid email", s));
        }
        Ok(Self::Email(email))
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Email(email) => f.write_str(email),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnsureRequest {
    pub workspace_id: Uuid,
    pub user: UserRef,
    pub role: MemberRole,
    /// Change the role of an existing row when it differs.
    pub update_role: bool,
    pub dry_run: bool,
    /// Used when `user` is an email.
    pub identity_key: IdentityKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EnsureOutcome {
    AlreadyMember { membership_id: Uuid },
    Inserted { membership_id: Uuid },
    WouldInsert,
    RoleMismatch { current: String, requested: MemberRole },
    RoleUpdated { from: String, to: MemberRole },
    WouldUpdateRole { from: String, to: MemberRole },
    Duplicate { membership_ids: Vec<Uuid> },
}

/// Verify that `request.user` is a member of `request.workspace_id` and
/// insert the row when it is missing.
///
/// Unlike the bulk reconciler, errors here stop the command.
pub async fn ensure_membership<S: TenantStore + ?Sized>(
    store: &S,
    audit: &AuditLogger,
    request: &EnsureRequest,
) -> anyhow::Result<EnsureOutcome> {
    let workspace = store
        .get_workspace(request.workspace_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("workspace {} not found", request.workspace_id))?;

    let (user_id, profile_id) = resolve_user(store, &request.user, request.identity_key).await?;

    let rows = store.find_memberships(workspace.id, user_id).await?;
    tracing::debug!(
        workspace = %workspace.name,
        user_id = %user_id,
        rows = rows.len(),
        "Membership pre-check"
    );

    let outcome = match rows.as_slice() {
        [] => {
            if request.dry_run {
                audit
                    .log_membership_inserted(
                        workspace.id,
                        profile_id,
                        user_id,
                        request.role.as_str(),
                        true,
                    )
                    .await?;
                EnsureOutcome::WouldInsert
            } else {
                let row = store
                    .insert_membership(workspace.id, user_id, request.role)
                    .await?;
                audit
                    .log_membership_inserted(
                        workspace.id,
                        profile_id,
                        user_id,
                        request.role.as_str(),
                        false,
                    )
                    .await?;
                tracing::info!(
                    workspace = %workspace.name,
                    user_id = %user_id,
                    role = %request.role,
                    "Inserted membership"
                );
                EnsureOutcome::Inserted {
                    membership_id: row.id,
                }
            }
        }
        [row] if row.parsed_role() == Some(request.role) => EnsureOutcome::AlreadyMember {
            membership_id: row.id,
        },
        [row] if request.update_role => {
            if !request.dry_run {
                store.update_membership_role(row.id, request.role).await?;
                tracing::info!(
                    workspace = %workspace.name,
                    user_id = %user_id,
                    from = %row.role,
                    to = %request.role,
                    "Updated membership role"
                );
            }
            audit
                .log_role_updated(
                    workspace.id,
                    user_id,
                    &row.role,
                    request.role.as_str(),
                    request.dry_run,
                )
                .await?;
            if request.dry_run {
                EnsureOutcome::WouldUpdateRole {
                    from: row.role.clone(),
                    to: request.role,
                }
            } else {
                EnsureOutcome::RoleUpdated {
                    from: row.role.clone(),
                    to: request.role,
                }
            }
        }
        [row] => {
            audit
                .log_role_mismatch(workspace.id, user_id, &row.role, request.role.as_str())
                .await?;
            EnsureOutcome::RoleMismatch {
                current: row.role.clone(),
                requested: request.role,
            }
        }
        many => {
            let ids: Vec<Uuid> = many.iter().map(|m| m.id).collect();
            audit
                .log_duplicate_membership(workspace.id, user_id, &ids)
                .await?;
            EnsureOutcome::Duplicate {
                membership_ids: ids,
            }
        }
    };

    Ok(outcome)
}

async fn resolve_user<S: TenantStore + ?Sized>(
    store: &S,
    user: &UserRef,
    key: IdentityKey,
) -> anyhow::Result<(Uuid, Option<Uuid>)> {
    match user {
        UserRef::Id(id) => Ok((*id, None)),
        UserRef::Email(email) => {
            let profile = store
                .find_profile_by_email(email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no profile with email {}", email))?;
            let identity = profile.identity(key).ok_or_else(|| {
                anyhow::anyhow!(
                    "profile {} has no {}; pass the identity explicitly",
                    profile.id,
                    key
                )
            })?;
            Ok((identity, Some(profile.id)))
        }
    }
}
