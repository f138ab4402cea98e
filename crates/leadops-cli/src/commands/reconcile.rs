//! `leadops reconcile`

use std::fmt::Write as _;

use leadops_core::{IdentityKey, LeadopsConfig, MemberRole, MembershipDecision, ReconcileOptions};
use leadops_runtime::{OutcomeStatus, ReconcileReport, Reconciler};

use super::{connect_store, open_audit, print_json};

#[derive(Debug, Clone, Copy)]
pub struct ReconcileArgs {
    pub dry_run: bool,
    pub identity_key: Option<IdentityKey>,
    pub role: Option<MemberRole>,
    pub json: bool,
}

fn options(config: &LeadopsConfig, args: &ReconcileArgs) -> ReconcileOptions {
    let base = config.reconcile.options();
    ReconcileOptions {
        identity_key: args.identity_key.unwrap_or(base.identity_key),
        default_role: args.role.unwrap_or(base.default_role),
    }
}

pub async fn run(config: &LeadopsConfig, args: ReconcileArgs) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let audit = open_audit(config)?;

    let report = Reconciler::new(&store, &audit, options(config, &args))
        .run(args.dry_run)
        .await?;

    if args.json {
        print_json(&report)?;
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

pub fn render(report: &ReconcileReport) -> String {
    let mut out = String::new();
    let mode = if report.dry_run { " (dry run)" } else { "" };
    let _ = writeln!(
        out,
        "Reconciling memberships by {}{}",
        report.identity_key, mode
    );
    let _ = writeln!(out, "{}", "─".repeat(60));

    for o in &report.outcomes {
        let line = match (&o.outcome, &o.decision) {
            (OutcomeStatus::Inserted { membership_id }, _) => {
                format!("  ✓ inserted       {} → {} ({})", o.label, o.workspace_id, membership_id)
            }
            (OutcomeStatus::WouldInsert, _) => {
                format!("  + would insert   {} → {}", o.label, o.workspace_id)
            }
            (OutcomeStatus::InsertFailed { error }, _) => {
                format!("  ✗ insert failed  {} → {}: {}", o.label, o.workspace_id, error)
            }
            (OutcomeStatus::CheckFailed { error }, _) => {
                format!("  ✗ check failed   {} → {}: {}", o.label, o.workspace_id, error)
            }
            (OutcomeStatus::NoChange, Some(MembershipDecision::Duplicate { membership_ids, .. })) => {
                format!(
                    "  ⚠ duplicate      {} → {} ({} rows)",
                    o.label,
                    o.workspace_id,
                    membership_ids.len()
                )
            }
            (OutcomeStatus::NoChange, Some(MembershipDecision::Unresolvable { identity_key })) => {
                format!("  ⚠ unresolvable   {} ({} is NULL)", o.label, identity_key)
            }
            (OutcomeStatus::NoChange, _) => continue,
        };
        let _ = writeln!(out, "{}", line);
    }

    let s = &report.summary;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Examined {}: {} satisfied, {} {}, {} duplicate, {} unresolvable, {} failed",
        s.examined,
        s.satisfied,
        if report.dry_run { s.to_insert } else { report.inserted },
        if report.dry_run { "to insert" } else { "inserted" },
        s.duplicates,
        s.unresolvable,
        report.failed
    );
    let pending = report.dry_run && s.to_insert > 0;
    if report.failed == 0 && s.duplicates == 0 && s.unresolvable == 0 && !pending {
        let _ = writeln!(out, "✅ Every profile with a workspace has a membership.");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadops_core::ReconcileSummary;
    use leadops_runtime::ProfileOutcome;
    use uuid::Uuid;

    fn report(outcomes: Vec<ProfileOutcome>, summary: ReconcileSummary) -> ReconcileReport {
        ReconcileReport {
            run_id: Uuid::nil(),
            dry_run: false,
            identity_key: IdentityKey::UserId,
            summary,
            inserted: outcomes
                .iter()
                .filter(|o| matches!(o.outcome, OutcomeStatus::Inserted { .. }))
                .count(),
            failed: 0,
            outcomes,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = LeadopsConfig::default();
        let args = ReconcileArgs {
            dry_run: false,
            identity_key: Some(IdentityKey::ProfileId),
            role: None,
            json: false,
        };
        let opts = options(&config, &args);
        assert_eq!(opts.identity_key, IdentityKey::ProfileId);
        assert_eq!(opts.default_role, MemberRole::Owner);
    }

    #[test]
    fn test_render_lists_changes_only() {
        let ws = Uuid::new_v4();
        let outcomes = vec![
            ProfileOutcome {
                profile_id: Uuid::new_v4(),
                workspace_id: ws,
                label: "ana@loja.com".to_string(),
                decision: None,
                outcome: OutcomeStatus::Inserted {
                    membership_id: Uuid::new_v4(),
                },
            },
            ProfileOutcome {
                profile_id: Uuid::new_v4(),
                workspace_id: ws,
                label: "bia@loja.com".to_string(),
                decision: None,
                outcome: OutcomeStatus::NoChange,
            },
        ];
        let summary = ReconcileSummary {
            examined: 2,
            to_insert: 1,
            satisfied: 1,
            duplicates: 0,
            unresolvable: 0,
        };

        let text = render(&report(outcomes, summary));
        assert!(text.contains("inserted       ana@loja.com"));
        assert!(!text.contains("bia@loja.com"));
        assert!(text.contains("Examined 2: 1 satisfied, 1 inserted"));
        assert!(text.contains("✅"));
    }

    #[test]
    fn test_render_dry_run_with_planned_inserts() {
        let outcomes = vec![ProfileOutcome {
            profile_id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            label: "ana@loja.com".to_string(),
            decision: None,
            outcome: OutcomeStatus::WouldInsert,
        }];
        let summary = ReconcileSummary {
            examined: 1,
            to_insert: 1,
            satisfied: 0,
            duplicates: 0,
            unresolvable: 0,
        };
        let mut planned = report(outcomes, summary);
        planned.dry_run = true;

        let text = render(&planned);
        assert!(text.contains("(dry run)"));
        assert!(text.contains("+ would insert   ana@loja.com"));
        assert!(text.contains("1 to insert"));
        assert!(!text.contains("✅"));

        let clean = ReconcileReport {
            outcomes: Vec::new(),
            summary: ReconcileSummary {
                examined: 1,
                to_insert: 0,
                satisfied: 1,
                duplicates: 0,
                unresolvable: 0,
            },
            ..planned
        };
        assert!(render(&clean).contains("✅"));
    }

    #[test]
    fn test_render_flags_unresolvable() {
        let outcomes = vec![ProfileOutcome {
            profile_id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            label: "Carla".to_string(),
            decision: Some(MembershipDecision::Unresolvable {
                identity_key: IdentityKey::UserId,
            }),
            outcome: OutcomeStatus::NoChange,
        }];
        let summary = ReconcileSummary {
            examined: 1,
            unresolvable: 1,
            ..Default::default()
        };

        let text = render(&report(outcomes, summary));
        assert!(text.contains("unresolvable   Carla (user_id is NULL)"));
        assert!(!text.contains("✅"));
    }
}
