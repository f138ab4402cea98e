//! Audit logger implementation.
//!
//! Provides the main `AuditLogger` type with helper methods for the events
//! membership repair and binding audits produce.

use leadops_core::AuditConfig;
use leadops_core::binding::BindingReport;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AuditError;
use crate::event::{AuditEvent, AuditEventBuilder, AuditEventType};
use crate::storage::{AuditStorage, NullStorage, create_storage};

/// The main audit logger.
///
/// Every event is stamped with the logger's `run_id` and operator.
pub struct AuditLogger {
    enabled: bool,
    run_id: Uuid,
    operator: Option<String>,
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = Arc::from(create_storage(config)?);
        Ok(Self::with_storage(config.enabled, storage))
    }

    /// Create a logger with a custom storage backend.
    pub fn with_storage(enabled: bool, storage: Arc<dyn AuditStorage>) -> Self {
        Self {
            enabled,
            run_id: Uuid::new_v4(),
            operator: current_operator(),
            storage,
        }
    }

    /// Create a disabled (no-op) logger.
    pub fn disabled() -> Self {
        Self::with_storage(false, Arc::new(NullStorage))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn builder(&self, event_type: AuditEventType) -> AuditEventBuilder {
        let builder = AuditEvent::builder(event_type).run_id(self.run_id);
        match &self.operator {
            Some(op) => builder.operator(op.clone()),
            None => builder,
        }
    }

    /// Log an audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditError> {
        if !self.enabled {
            return Ok(());
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            run_id = %self.run_id,
            "Audit event"
        );

        self.storage.store(event).await
    }

    /// A membership row was inserted (or would be, when `dry_run`).
    pub async fn log_membership_inserted(
        &self,
        workspace_id: Uuid,
        profile_id: Option<Uuid>,
        user_id: Uuid,
        role: &str,
        dry_run: bool,
    ) -> Result<(), AuditError> {
        let mut builder = self
            .builder(AuditEventType::MembershipInserted)
            .workspace(workspace_id)
            .user(user_id)
            .role(role)
            .dry_run(dry_run);
        if let Some(p) = profile_id {
            builder = builder.profile(p);
        }
        self.log(builder.build()).await
    }

    pub async fn log_membership_insert_failed(
        &self,
        workspace_id: Uuid,
        profile_id: Option<Uuid>,
        user_id: Uuid,
        role: &str,
        error: &str,
    ) -> Result<(), AuditError> {
        let mut builder = self
            .builder(AuditEventType::MembershipInsertFailed)
            .workspace(workspace_id)
            .user(user_id)
            .role(role)
            .error(error);
        if let Some(p) = profile_id {
            builder = builder.profile(p);
        }
        self.log(builder.build()).await
    }

    pub async fn log_duplicate_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        membership_ids: &[Uuid],
    ) -> Result<(), AuditError> {
        let event = self
            .builder(AuditEventType::DuplicateMembership)
            .workspace(workspace_id)
            .user(user_id)
            .meta(serde_json::json!({ "membership_ids": membership_ids }))
            .build();
        self.log(event).await
    }

    pub async fn log_role_mismatch(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        current: &str,
        requested: &str,
    ) -> Result<(), AuditError> {
        let event = self
            .builder(AuditEventType::MembershipRoleMismatch)
            .workspace(workspace_id)
            .user(user_id)
            .role(current)
            .meta(serde_json::json!({ "requested_role": requested }))
            .build();
        self.log(event).await
    }

    pub async fn log_role_updated(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        from: &str,
        to: &str,
        dry_run: bool,
    ) -> Result<(), AuditError> {
        let event = self
            .builder(AuditEventType::MembershipRoleUpdated)
            .workspace(workspace_id)
            .user(user_id)
            .role(to)
            .dry_run(dry_run)
            .meta(serde_json::json!({ "previous_role": from }))
            .build();
        self.log(event).await
    }

    /// Record the counts of a binding audit.
    pub async fn log_binding_audit(&self, report: &BindingReport) -> Result<(), AuditError> {
        let event = self
            .builder(AuditEventType::BindingAudited)
            .meta(serde_json::json!({
                "bound": report.bound.len(),
                "orphaned": report.orphaned_instances.len(),
                "disconnected": report.disconnected_workspaces.len(),
                "conflicts": report.conflicting_claims.len(),
                "multi_instance": report.multi_instance_workspaces.len(),
            }))
            .build();
        self.log(event).await
    }

    /// Query audit events with filters.
    pub async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.storage.query(filter).await
    }
}

fn current_operator() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub workspace_id: Option<Uuid>,
    pub event_type: Option<AuditEventType>,
    pub run_id: Option<Uuid>,
    /// Keep only the newest `limit` matches.
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(ws) = self.workspace_id
            && event.workspace_id != Some(ws)
        {
            return false;
        }
        if let Some(t) = self.event_type
            && event.event_type != t
        {
            return false;
        }
        if let Some(run) = self.run_id
            && event.run_id != Some(run)
        {
            return false;
        }
        true
    }
}
