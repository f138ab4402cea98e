//! `leadops ensure-member`

use leadops_core::LeadopsConfig;
use leadops_runtime::{EnsureOutcome, EnsureRequest, ensure_membership};

use super::{connect_store, open_audit, print_json};

pub async fn run(config: &LeadopsConfig, request: &EnsureRequest, json: bool) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let audit = open_audit(config)?;

    let outcome = ensure_membership(&store, &audit, request).await?;

    if json {
        print_json(&outcome)?;
    } else {
        println!("{}", describe(request, &outcome));
    }
    Ok(())
}

fn describe(request: &EnsureRequest, outcome: &EnsureOutcome) -> String {
    let who = &request.user;
    let ws = request.workspace_id;
    match outcome {
        EnsureOutcome::AlreadyMember { membership_id } => {
            format!("✅ {} is already a {} of {} ({})", who, request.role, ws, membership_id)
        }
        EnsureOutcome::Inserted { membership_id } => {
            format!("✓ Added {} to {} as {} ({})", who, ws, request.role, membership_id)
        }
        EnsureOutcome::WouldInsert => {
            format!("+ Would add {} to {} as {} (dry run)", who, ws, request.role)
        }
        EnsureOutcome::RoleMismatch { current, requested } => format!(
            "⚠ {} is a member of {} as {}, not {}. Pass --update-role to change it.",
            who, ws, current, requested
        ),
        EnsureOutcome::RoleUpdated { from, to } => {
            format!("✓ Changed role of {} in {}: {} → {}", who, ws, from, to)
        }
        EnsureOutcome::WouldUpdateRole { from, to } => format!(
            "+ Would change role of {} in {}: {} → {} (dry run)",
            who, ws, from, to
        ),
        EnsureOutcome::Duplicate { membership_ids } => format!(
            "⚠ {} has {} membership rows in {}; resolve manually: {}",
            who,
            membership_ids.len(),
            ws,
            membership_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadops_core::{IdentityKey, MemberRole};
    use leadops_runtime::UserRef;
    use uuid::Uuid;

    #[test]
    fn test_describe_role_mismatch_hints_flag() {
        let request = EnsureRequest {
            workspace_id: Uuid::nil(),
            user: UserRef::Email("ana@loja.com".to_string()),
            role: MemberRole::Admin,
            update_role: false,
            dry_run: false,
            identity_key: IdentityKey::UserId,
        };
        let text = describe(
            &request,
            &EnsureOutcome::RoleMismatch {
                current: "seller".to_string(),
                requested: MemberRole::Admin,
            },
        );
        assert!(text.contains("ana@loja.com"));
        assert!(text.contains("as seller, not admin"));
        assert!(text.contains("--update-role"));
    }
}
