//! # leadops-audit
//!
//! Audit log of repair actions performed by leadops.
//!
//! Every membership insert, insert failure, duplicate, role change and
//! binding audit is recorded as one [`AuditEvent`]. Events of one command
//! invocation share a `run_id`.
//!
//! ## Event Types
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `MembershipInserted` | Membership row created (or planned, in a dry run) |
//! | `MembershipInsertFailed` | Insert failed; the run continued |
//! | `DuplicateMembership` | Several rows for one (user, workspace) pair |
//! | `MembershipRoleMismatch` | Existing row has another role than requested |
//! | `MembershipRoleUpdated` | Role of an existing row changed |
//! | `BindingAudited` | Gateway binding audit ran |
//!
//! ## Storage
//!
//! - **file**: JSON Lines, append-only
//! - **console**: human-readable lines on stderr
//! - **dual**: both

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder, AuditEventType};
pub use logger::{AuditFilter, AuditLogger};
pub use storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, NullStorage};
