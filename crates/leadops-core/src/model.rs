//! Rows of the CRM schema as the admin tooling sees them.
//!
//! These mirror the Postgres tables read with the service-role connection
//! (`workspaces`, `profiles`, `workspace_members`, `whatsapp_connections`,
//! `leads`, `workspace_subscriptions`). Only the columns the consistency
//! checks need are carried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when parsing one of the closed string enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseError {
    fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Tenant boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    /// Gateway instance this workspace claims, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution_instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Application-level user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Auth identity. Nullable in production data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// The "current" workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<Uuid>,
}

impl Profile {
    /// Resolve the membership identity for this profile.
    ///
    /// Returns `None` when the selected key is NULL; callers must not
    /// substitute the other key.
    pub fn identity(&self, key: IdentityKey) -> Option<Uuid> {
        match key {
            IdentityKey::UserId => self.user_id,
            IdentityKey::ProfileId => Some(self.id),
        }
    }

    /// Human label for logs: email, then name, then id.
    pub fn label(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.full_name.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Which `profiles` column is stored in `workspace_members.user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    /// `profiles.user_id` (the auth identity).
    #[default]
    UserId,
    /// `profiles.id`.
    ProfileId,
}

impl IdentityKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserId => "user_id",
            Self::ProfileId => "profile_id",
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user_id" | "user-id" => Ok(Self::UserId),
            "profile_id" | "profile-id" | "id" => Ok(Self::ProfileId),
            _ => Err(ParseError::new("identity key", s, "user_id, profile_id")),
        }
    }
}

/// Role within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Owner,
    Admin,
    Member,
    Seller,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Seller => "seller",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "seller" => Ok(Self::Seller),
            _ => Err(ParseError::new("role", s, "owner, admin, member, seller")),
        }
    }
}

/// A `workspace_members` row.
///
/// `role` is kept as the raw column value so rows with unexpected roles can
/// still be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Membership {
    pub fn parsed_role(&self) -> Option<MemberRole> {
        self.role.parse().ok()
    }
}

/// A `whatsapp_connections` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppConnection {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub instance_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// An instance as reported by the WhatsApp gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInstance {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_jid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
}

/// Lead temperature classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadTemperature {
    Cold,
    Warm,
    Hot,
}

impl LeadTemperature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Warm => "warm",
            Self::Hot => "hot",
        }
    }
}

impl FromStr for LeadTemperature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cold" => Ok(Self::Cold),
            "warm" => Ok(Self::Warm),
            "hot" => Ok(Self::Hot),
            _ => Err(ParseError::new("lead temperature", s, "cold, warm, hot")),
        }
    }
}

/// Billing state attached to a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    pub status: String,
}

/// Everything `inspect workspace` prints for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub workspace: Workspace,
    pub members: Vec<Membership>,
    pub connections: Vec<WhatsAppConnection>,
    pub lead_count: i64,
    pub hot_lead_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionSummary>,
    /// Profiles whose current workspace is this one.
    pub profiles: Vec<Profile>,
}
