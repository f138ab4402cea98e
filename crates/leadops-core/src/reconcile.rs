//! Membership decisions for profiles that point at a current workspace.
//!
//! Every profile with a non-null `workspace_id` must have exactly one
//! `workspace_members` row for (identity, workspace). [`decide_membership`]
//! looks at one profile and the rows found for it and says what to do.
//! Execution (pre-check select, insert, logging) lives in `leadops-runtime`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{IdentityKey, MemberRole, Membership, Profile};

/// Knobs for a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReconcileOptions {
    pub identity_key: IdentityKey,
    /// Role given to inserted memberships.
    pub default_role: MemberRole,
}

/// What to do about one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MembershipDecision {
    /// No row exists; one should be created.
    Insert { identity: Uuid, role: MemberRole },
    /// Exactly one row exists. `membership_id` is `None` when the row was
    /// created earlier in the same run.
    Satisfied {
        identity: Uuid,
        membership_id: Option<Uuid>,
    },
    /// More than one row for the same pair. Reported, never deleted.
    Duplicate {
        identity: Uuid,
        membership_ids: Vec<Uuid>,
    },
    /// The configured identity column is NULL for this profile.
    Unresolvable { identity_key: IdentityKey },
}

/// A decision bound to the profile and workspace it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDecision {
    pub profile_id: Uuid,
    pub workspace_id: Uuid,
    #[serde(flatten)]
    pub decision: MembershipDecision,
}

/// Decide what to do for `profile`, given the memberships already stored.
///
/// `existing` may contain unrelated rows; only rows matching the resolved
/// identity and the profile's workspace count. Returns `None` for profiles
/// without a current workspace.
pub fn decide_membership(
    profile: &Profile,
    existing: &[Membership],
    options: &ReconcileOptions,
) -> Option<ProfileDecision> {
    let workspace_id = profile.workspace_id?;

    let decision = match profile.identity(options.identity_key) {
        None => MembershipDecision::Unresolvable {
            identity_key: options.identity_key,
        },
        Some(identity) => {
            let matching: Vec<Uuid> = existing
                .iter()
                .filter(|m| m.user_id == identity && m.workspace_id == workspace_id)
                .map(|m| m.id)
                .collect();

            match matching.len() {
                0 => MembershipDecision::Insert {
                    identity,
                    role: options.default_role,
                },
                1 => MembershipDecision::Satisfied {
                    identity,
                    membership_id: Some(matching[0]),
                },
                _ => MembershipDecision::Duplicate {
                    identity,
                    membership_ids: matching,
                },
            }
        }
    };

    Some(ProfileDecision {
        profile_id: profile.id,
        workspace_id,
        decision,
    })
}

/// Counts over a set of decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub examined: usize,
    pub to_insert: usize,
    pub satisfied: usize,
    pub duplicates: usize,
    pub unresolvable: usize,
}

impl ReconcileSummary {
    pub fn record(&mut self, decision: &MembershipDecision) {
        self.examined += 1;
        match decision {
            MembershipDecision::Insert { .. } => self.to_insert += 1,
            MembershipDecision::Satisfied { .. } => self.satisfied += 1,
            MembershipDecision::Duplicate { .. } => self.duplicates += 1,
            MembershipDecision::Unresolvable { .. } => self.unresolvable += 1,
        }
    }

    pub fn from_decisions<'a>(decisions: impl IntoIterator<Item = &'a ProfileDecision>) -> Self {
        let mut summary = Self::default();
        for d in decisions {
            summary.record(&d.decision);
        }
        summary
    }

    /// True when every examined profile already satisfies the invariant.
    pub fn is_consistent(&self) -> bool {
        self.to_insert == 0 && self.duplicates == 0 && self.unresolvable == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(user_id: Option<Uuid>, workspace_id: Option<Uuid>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            user_id,
            email: None,
            full_name: None,
            workspace_id,
        }
    }

    fn membership(user_id: Uuid, workspace_id: Uuid) -> Membership {
        Membership {
            id: Uuid::new_v4(),
            workspace_id,
            user_id,
            role: "owner".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_no_workspace_is_skipped() {
        let p = profile(Some(Uuid::new_v4()), None);
        assert!(decide_membership(&p, &[], &ReconcileOptions::default()).is_none());
    }

    #[test]
    fn test_missing_row_is_insert_with_default_role() {
        let uid = Uuid::new_v4();
        let ws = Uuid::new_v4();
        let p = profile(Some(uid), Some(ws));
        let opts = ReconcileOptions {
            identity_key: IdentityKey::UserId,
            default_role: MemberRole::Owner,
        };

        let d = decide_membership(&p, &[membership(uid, Uuid::new_v4())], &opts).unwrap();
        assert_eq!(d.workspace_id, ws);
        assert_eq!(
            d.decision,
            MembershipDecision::Insert {
                identity: uid,
                role: MemberRole::Owner
            }
        );
    }

    #[test]
    fn test_single_row_is_satisfied() {
        let uid = Uuid::new_v4();
        let ws = Uuid::new_v4();
        let p = profile(Some(uid), Some(ws));
        let m = membership(uid, ws);

        let d = decide_membership(&p, std::slice::from_ref(&m), &ReconcileOptions::default())
            .unwrap();
        assert_eq!(
            d.decision,
            MembershipDecision::Satisfied {
                identity: uid,
                membership_id: Some(m.id)
            }
        );
    }

    #[test]
    fn test_duplicate_rows_are_reported() {
        let uid = Uuid::new_v4();
        let ws = Uuid::new_v4();
        let p = profile(Some(uid), Some(ws));
        let rows = vec![membership(uid, ws), membership(uid, ws)];

        let d = decide_membership(&p, &rows, &ReconcileOptions::default()).unwrap();
        match d.decision {
            MembershipDecision::Duplicate { membership_ids, .. } => {
                assert_eq!(membership_ids, vec![rows[0].id, rows[1].id]);
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn test_null_user_id_is_unresolvable() {
        let ws = Uuid::new_v4();
        let p = profile(None, Some(ws));
        // A row keyed by profiles.id must not satisfy a user_id run.
        let rows = vec![membership(p.id, ws)];

        let d = decide_membership(&p, &rows, &ReconcileOptions::default()).unwrap();
        assert_eq!(
            d.decision,
            MembershipDecision::Unresolvable {
                identity_key: IdentityKey::UserId
            }
        );
    }

    #[test]
    fn test_profile_id_key() {
        let ws = Uuid::new_v4();
        let p = profile(None, Some(ws));
        let rows = vec![membership(p.id, ws)];
        let opts = ReconcileOptions {
            identity_key: IdentityKey::ProfileId,
            ..Default::default()
        };

        let d = decide_membership(&p, &rows, &opts).unwrap();
        assert!(matches!(d.decision, MembershipDecision::Satisfied { .. }));
    }

    #[test]
    fn test_summary_counts() {
        let ws = Uuid::new_v4();
        let uid = Uuid::new_v4();
        let opts = ReconcileOptions::default();
        let profiles = [
            profile(Some(uid), Some(ws)),
            profile(Some(Uuid::new_v4()), Some(ws)),
            profile(None, Some(ws)),
        ];
        let rows = vec![membership(uid, ws)];

        let decisions: Vec<_> = profiles
            .iter()
            .filter_map(|p| decide_membership(p, &rows, &opts))
            .collect();
        let summary = ReconcileSummary::from_decisions(&decisions);

        assert_eq!(
            summary,
            ReconcileSummary {
                examined: 3,
                to_insert: 1,
                satisfied: 1,
                duplicates: 0,
                unresolvable: 1,
            }
        );
        assert!(!summary.is_consistent());
    }

    #[test]
    fn test_decision_serializes_with_tag() {
        let d = ProfileDecision {
            profile_id: Uuid::nil(),
            workspace_id: Uuid::nil(),
            decision: MembershipDecision::Unresolvable {
                identity_key: IdentityKey::UserId,
            },
        };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["decision"], "unresolvable");
        assert_eq!(v["identity_key"], "user_id");
    }
}
