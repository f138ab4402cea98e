//! # leadops-core
//!
//! Shared types for the leadops workspace tooling:
//!
//! - [`model`]: rows of the multi-tenant CRM schema (workspaces, profiles,
//!   memberships, WhatsApp connections, leads, subscriptions)
//! - [`config`]: `leadops.yaml` configuration
//! - [`reconcile`]: membership decisions for profiles pointing at a workspace
//! - [`binding`]: gateway-instance ↔ workspace binding audit
//! - [`sanitize`]: input sanitization helpers

pub mod binding;
pub mod config;
pub mod model;
pub mod reconcile;
pub mod sanitize;

pub use binding::{
    BindingReport, BoundPair, ConflictingClaim, DisconnectReason, DisconnectedWorkspace,
    MultiInstanceWorkspace, OrphanedInstance, WorkspaceClaim, audit_bindings, claims_from,
};
pub use config::{
    AuditConfig, ConfigError, GatewayConfig, LeadopsConfig, ReconcileConfig, UpstreamConfig,
};
pub use model::{
    GatewayInstance, IdentityKey, LeadTemperature, MemberRole, Membership, ParseError, Profile,
    SubscriptionSummary, WhatsAppConnection, Workspace, WorkspaceSummary,
};
pub use reconcile::{
    MembershipDecision, ProfileDecision, ReconcileOptions, ReconcileSummary, decide_membership,
};
