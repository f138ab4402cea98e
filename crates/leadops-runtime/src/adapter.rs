use async_trait::async_trait;
use leadops_core::{
    GatewayInstance, MemberRole, Membership, Profile, WhatsAppConnection, Workspace,
    WorkspaceSummary,
};
use uuid::Uuid;

/// Access to the tenant tables.
///
/// Implementations talk to the database with a service-role connection;
/// nothing here is scoped by row-level security.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Profiles whose current `workspace_id` is not NULL, ordered by id.
    async fn list_profiles_with_workspace(&self) -> anyhow::Result<Vec<Profile>>;

    async fn find_profile_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>>;

    /// Membership rows for one (workspace, user) pair. Pre-check before insert.
    async fn find_memberships(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<Membership>>;

    async fn insert_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> anyhow::Result<Membership>;

    async fn update_membership_role(
        &self,
        membership_id: Uuid,
        role: MemberRole,
    ) -> anyhow::Result<()>;

    async fn get_workspace(&self, workspace_id: Uuid) -> anyhow::Result<Option<Workspace>>;

    /// All workspaces, ordered by name.
    async fn list_workspaces(&self) -> anyhow::Result<Vec<Workspace>>;

    async fn list_connections(&self) -> anyhow::Result<Vec<WhatsAppConnection>>;

    /// Members, connections, lead counts and billing state for one workspace.
    async fn workspace_summary(
        &self,
        workspace_id: Uuid,
    ) -> anyhow::Result<Option<WorkspaceSummary>>;
}

/// The WhatsApp gateway's view of its instances.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn fetch_instances(&self) -> anyhow::Result<Vec<GatewayInstance>>;
}
