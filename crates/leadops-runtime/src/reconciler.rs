use crate::adapter::TenantStore;
use leadops_audit::AuditLogger;
use leadops_core::{
    IdentityKey, MembershipDecision, Profile, ReconcileOptions, ReconcileSummary,
    decide_membership,
};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// What happened to one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Inserted { membership_id: Uuid },
    /// Dry run: an insert was planned.
    WouldInsert,
    InsertFailed { error: String },
    /// The pre-check select failed; nothing was decided.
    CheckFailed { error: String },
    /// Satisfied, duplicate or unresolvable: nothing written.
    NoChange,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileOutcome {
    pub profile_id: Uuid,
    pub workspace_id: Uuid,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<MembershipDecision>,
    pub outcome: OutcomeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub identity_key: IdentityKey,
    pub summary: ReconcileSummary,
    pub inserted: usize,
    pub failed: usize,
    pub outcomes: Vec<ProfileOutcome>,
}

impl ReconcileReport {
    /// Pairs that were (or would be) inserted.
    pub fn inserted_pairs(&self) -> Vec<(Uuid, Uuid)> {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.outcome,
                    OutcomeStatus::Inserted { .. } | OutcomeStatus::WouldInsert
                )
            })
            .map(|o| (o.profile_id, o.workspace_id))
            .collect()
    }
}

/// Ensures every profile with a current workspace has a membership row.
///
/// One profile at a time: select, then insert when nothing was found.
/// A failed select or insert is logged and the run moves on.
pub struct Reconciler<'a, S: TenantStore + ?Sized> {
    store: &'a S,
    audit: &'a AuditLogger,
    options: ReconcileOptions,
}

impl<'a, S: TenantStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, audit: &'a AuditLogger, options: ReconcileOptions) -> Self {
        Self {
            store,
            audit,
            options,
        }
    }

    pub async fn run(&self, dry_run: bool) -> anyhow::Result<ReconcileReport> {
        let profiles = self.store.list_profiles_with_workspace().await?;
        tracing::info!(
            profiles = profiles.len(),
            identity_key = %self.options.identity_key,
            dry_run,
            "Reconciling workspace memberships"
        );

        // Pairs created (or planned) earlier in this run.
        let mut pending: HashSet<(Uuid, Uuid)> = HashSet::new();
        let mut summary = ReconcileSummary::default();
        let mut outcomes = Vec::with_capacity(profiles.len());

        for profile in &profiles {
            let Some(workspace_id) = profile.workspace_id else {
                continue;
            };

            let existing = match profile.identity(self.options.identity_key) {
                Some(identity) => match self.store.find_memberships(workspace_id, identity).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        tracing::warn!(
                            profile = %profile.label(),
                            workspace_id = %workspace_id,
                            error = %e,
                            "Membership pre-check failed, skipping profile"
                        );
                        outcomes.push(ProfileOutcome {
                            profile_id: profile.id,
                            workspace_id,
                            label: profile.label(),
                            decision: None,
                            outcome: OutcomeStatus::CheckFailed {
                                error: e.to_string(),
                            },
                        });
                        continue;
                    }
                },
                None => Vec::new(),
            };

            let Some(mut decided) = decide_membership(profile, &existing, &self.options) else {
                continue;
            };

            if let MembershipDecision::Insert { identity, .. } = decided.decision
                && pending.contains(&(workspace_id, identity))
            {
                decided.decision = MembershipDecision::Satisfied {
                    identity,
                    membership_id: None,
                };
            }
            summary.record(&decided.decision);

            let outcome = self
                .apply(profile, workspace_id, &decided.decision, dry_run, &mut pending)
                .await?;

            outcomes.push(ProfileOutcome {
                profile_id: profile.id,
                workspace_id,
                label: profile.label(),
                decision: Some(decided.decision),
                outcome,
            });
        }

        let inserted = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, OutcomeStatus::Inserted { .. }))
            .count();
        let failed = outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.outcome,
                    OutcomeStatus::InsertFailed { .. } | OutcomeStatus::CheckFailed { .. }
                )
            })
            .count();

        tracing::info!(
            examined = summary.examined,
            inserted,
            planned = if dry_run { summary.to_insert } else { 0 },
            duplicates = summary.duplicates,
            unresolvable = summary.unresolvable,
            failed,
            "Reconciliation finished"
        );

        Ok(ReconcileReport {
            run_id: self.audit.run_id(),
            dry_run,
            identity_key: self.options.identity_key,
            summary,
            inserted,
            failed,
            outcomes,
        })
    }

    async fn apply(
        &self,
        profile: &Profile,
        workspace_id: Uuid,
        decision: &MembershipDecision,
        dry_run: bool,
        pending: &mut HashSet<(Uuid, Uuid)>,
    ) -> anyhow::Result<OutcomeStatus> {
        let status = match decision {
            MembershipDecision::Insert { identity, role } => {
                if dry_run {
                    tracing::info!(
                        profile = %profile.label(),
                        workspace_id = %workspace_id,
                        role = %role,
                        "Would insert membership"
                    );
                    self.audit
                        .log_membership_inserted(
                            workspace_id,
                            Some(profile.id),
                            *identity,
                            role.as_str(),
                            true,
                        )
                        .await?;
                    pending.insert((workspace_id, *identity));
                    OutcomeStatus::WouldInsert
                } else {
                    match self
                        .store
                        .insert_membership(workspace_id, *identity, *role)
                        .await
                    {
                        Ok(row) => {
                            tracing::info!(
                                profile = %profile.label(),
                                workspace_id = %workspace_id,
                                membership_id = %row.id,
                                role = %role,
                                "Inserted membership"
                            );
                            self.audit
                                .log_membership_inserted(
                                    workspace_id,
                                    Some(profile.id),
                                    *identity,
                                    role.as_str(),
                                    false,
                                )
                                .await?;
                            pending.insert((workspace_id, *identity));
                            OutcomeStatus::Inserted {
                                membership_id: row.id,
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                profile = %profile.label(),
                                workspace_id = %workspace_id,
                                error = %e,
                                "Membership insert failed, continuing"
                            );
                            self.audit
                                .log_membership_insert_failed(
                                    workspace_id,
                                    Some(profile.id),
                                    *identity,
                                    role.as_str(),
                                    &e.to_string(),
                                )
                                .await?;
                            OutcomeStatus::InsertFailed {
                                error: e.to_string(),
                            }
                        }
                    }
                }
            }
            MembershipDecision::Duplicate {
                identity,
                membership_ids,
            } => {
                tracing::warn!(
                    profile = %profile.label(),
                    workspace_id = %workspace_id,
                    rows = membership_ids.len(),
                    "Duplicate membership rows"
                );
                self.audit
                    .log_duplicate_membership(workspace_id, *identity, membership_ids)
                    .await?;
                OutcomeStatus::NoChange
            }
            MembershipDecision::Unresolvable { identity_key } => {
                tracing::warn!(
                    profile = %profile.label(),
                    workspace_id = %workspace_id,
                    identity_key = %identity_key,
                    "Profile has no value for the identity key"
                );
                OutcomeStatus::NoChange
            }
            MembershipDecision::Satisfied { .. } => {
                tracing::debug!(profile = %profile.label(), "Membership present");
                OutcomeStatus::NoChange
            }
        };
        Ok(status)
    }
}
