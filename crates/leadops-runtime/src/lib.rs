//! # leadops-runtime
//!
//! Executes the consistency checks from `leadops-core` against real data.
//!
//! Storage and the WhatsApp gateway sit behind the [`adapter::TenantStore`]
//! and [`adapter::GatewayClient`] traits; `leadops-adapter-pg` and
//! `leadops-gateway` provide the production implementations.
//!
//! Everything runs sequentially: one request at a time, no transactions.

pub mod adapter;
pub mod bindings;
pub mod ensure;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{GatewayClient, TenantStore};
pub use bindings::audit_gateway_bindings;
pub use ensure::{EnsureOutcome, EnsureRequest, UserRef, ensure_membership};
pub use reconciler::{OutcomeStatus, ProfileOutcome, ReconcileReport, Reconciler};
