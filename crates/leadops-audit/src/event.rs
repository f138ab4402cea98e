//! Audit event types.
//!
//! One event per repair decision that touched (or would have touched) the
//! database, plus one per binding audit run. Events from the same command
//! invocation share a `run_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // ===== Membership repair =====
    /// A membership row was inserted (or would be, in a dry run).
    MembershipInserted,
    /// Inserting a membership row failed; the run continued.
    MembershipInsertFailed,
    /// More than one row exists for a (user, workspace) pair.
    DuplicateMembership,
    /// Existing membership has a different role than requested.
    MembershipRoleMismatch,
    /// Role of an existing membership was changed.
    MembershipRoleUpdated,

    // ===== Gateway =====
    /// A binding audit was run.
    BindingAudited,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MembershipInserted => write!(f, "MEMBERSHIP_INSERTED"),
            Self::MembershipInsertFailed => write!(f, "MEMBERSHIP_INSERT_FAILED"),
            Self::DuplicateMembership => write!(f, "DUPLICATE_MEMBERSHIP"),
            Self::MembershipRoleMismatch => write!(f, "ROLE_MISMATCH"),
            Self::MembershipRoleUpdated => write!(f, "ROLE_UPDATED"),
            Self::BindingAudited => write!(f, "BINDING_AUDITED"),
        }
    }
}

impl std::str::FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "membership_inserted" => Ok(Self::MembershipInserted),
            "membership_insert_failed" => Ok(Self::MembershipInsertFailed),
            "duplicate_membership" => Ok(Self::DuplicateMembership),
            "membership_role_mismatch" | "role_mismatch" => Ok(Self::MembershipRoleMismatch),
            "membership_role_updated" | "role_updated" => Ok(Self::MembershipRoleUpdated),
            "binding_audited" => Ok(Self::BindingAudited),
            other => Err(format!("unknown audit event type '{}'", other)),
        }
    }
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    pub event_type: AuditEventType,

    /// Command invocation this event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,

    /// Who ran the command (OS user).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    // ===== Membership fields =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Uuid>,

    /// Value written to `workspace_members.user_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    // ===== Execution details =====
    /// Error message (if event_type indicates failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether this was a dry run.
    #[serde(default)]
    pub dry_run: bool,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl AuditEvent {
    /// Create a new audit event of the given type.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type,
            run_id: None,
            operator: None,
            workspace_id: None,
            profile_id: None,
            user_id: None,
            role: None,
            error: None,
            dry_run: false,
            meta: serde_json::Value::Null,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(event_type: AuditEventType) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type)
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] EVENT_TYPE workspace=... user=... [role=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.event_type,
        );

        if let Some(ws) = self.workspace_id {
            line.push_str(&format!(" workspace={}", ws));
        }
        if let Some(profile) = self.profile_id {
            line.push_str(&format!(" profile={}", profile));
        }
        if let Some(user) = self.user_id {
            line.push_str(&format!(" user={}", user));
        }
        if let Some(ref role) = self.role {
            line.push_str(&format!(" role={}", role));
        }
        if let Some(ref error) = self.error {
            line.push_str(&format!(" error=\"{}\"", error.replace('"', "'")));
        }
        if self.dry_run {
            line.push_str(" dry_run=true");
        }
        if let Some(obj) = self.meta.as_object() {
            for (k, v) in obj {
                line.push_str(&format!(" {}={}", k, v));
            }
        }

        line
    }
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event: AuditEvent::new(event_type),
        }
    }

    pub fn run_id(mut self, run_id: Uuid) -> Self {
        self.event.run_id = Some(run_id);
        self
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.event.operator = Some(operator.into());
        self
    }

    pub fn workspace(mut self, workspace_id: Uuid) -> Self {
        self.event.workspace_id = Some(workspace_id);
        self
    }

    pub fn profile(mut self, profile_id: Uuid) -> Self {
        self.event.profile_id = Some(profile_id);
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.event.user_id = Some(user_id);
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.event.role = Some(role.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.event.error = Some(error.into());
        self
    }

    pub fn dry_run(mut self, is_dry_run: bool) -> Self {
        self.event.dry_run = is_dry_run;
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.event.meta = meta;
        self
    }

    pub fn build(self) -> AuditEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(
            "membership-inserted".parse::<AuditEventType>().unwrap(),
            AuditEventType::MembershipInserted
        );
        assert_eq!(
            "ROLE_MISMATCH".parse::<AuditEventType>().unwrap(),
            AuditEventType::MembershipRoleMismatch
        );
        assert!("dropped_table".parse::<AuditEventType>().is_err());
    }

    #[test]
    fn test_log_line() {
        let ws = Uuid::nil();
        let event = AuditEvent::builder(AuditEventType::MembershipInsertFailed)
            .workspace(ws)
            .role("owner")
            .error("duplicate key \"workspace_members_pkey\"")
            .dry_run(true)
            .build();

        let line = event.to_log_line();
        assert!(line.contains("MEMBERSHIP_INSERT_FAILED"));
        assert!(line.contains(&format!("workspace={}", ws)));
        assert!(line.contains("role=owner"));
        assert!(line.contains("error=\"duplicate key 'workspace_members_pkey'\""));
        assert!(line.ends_with("dry_run=true"));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let event = AuditEvent::new(AuditEventType::BindingAudited);
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["event_type"], "binding_audited");
        assert!(v.get("workspace_id").is_none());
        assert!(v.get("meta").is_none());
        assert_eq!(v["dry_run"], false);
    }
}
