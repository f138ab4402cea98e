//! In-memory fakes for the store and gateway traits.

use crate::adapter::{GatewayClient, TenantStore};
use async_trait::async_trait;
use leadops_core::{
    GatewayInstance, MemberRole, Membership, Profile, WhatsAppConnection, Workspace,
    WorkspaceSummary,
};
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<Vec<Profile>>,
    memberships: Mutex<Vec<Membership>>,
    workspaces: Mutex<Vec<Workspace>>,
    connections: Mutex<Vec<WhatsAppConnection>>,
    failing_inserts: Mutex<HashSet<Uuid>>,
    failing_lookups: Mutex<HashSet<Uuid>>,
}

impl MemoryStore {
    pub fn add_profile(&self, profile: Profile) {
        self.profiles.lock().unwrap().push(profile);
    }

    pub fn add_membership(&self, workspace_id: Uuid, user_id: Uuid, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.memberships.lock().unwrap().push(Membership {
            id,
            workspace_id,
            user_id,
            role: role.to_string(),
            created_at: None,
        });
        id
    }

    pub fn add_workspace(&self, name: &str, instance: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.workspaces.lock().unwrap().push(Workspace {
            id,
            name: name.to_string(),
            owner_id: None,
            evolution_instance_name: instance.map(str::to_string),
            created_at: None,
        });
        id
    }

    pub fn add_connection(&self, workspace_id: Uuid, instance_name: &str) {
        self.connections.lock().unwrap().push(WhatsAppConnection {
            id: Uuid::new_v4(),
            workspace_id,
            instance_name: instance_name.to_string(),
            status: None,
        });
    }

    pub fn fail_inserts_for(&self, user_id: Uuid) {
        self.failing_inserts.lock().unwrap().insert(user_id);
    }

    pub fn fail_lookups_for(&self, user_id: Uuid) {
        self.failing_lookups.lock().unwrap().insert(user_id);
    }

    pub fn memberships(&self) -> Vec<Membership> {
        self.memberships.lock().unwrap().clone()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn list_profiles_with_workspace(&self) -> anyhow::Result<Vec<Profile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.workspace_id.is_some())
            .cloned()
            .collect())
    }

    async fn find_profile_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_memberships(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<Membership>> {
        if self.failing_lookups.lock().unwrap().contains(&user_id) {
            anyhow::bail!("connection reset by peer");
        }
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> anyhow::Result<Membership> {
        if self.failing_inserts.lock().unwrap().contains(&user_id) {
            anyhow::bail!("insert or update on table \"workspace_members\" violates foreign key constraint");
        }
        let row = Membership {
            id: Uuid::new_v4(),
            workspace_id,
            user_id,
            role: role.to_string(),
            created_at: None,
        };
        self.memberships.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update_membership_role(
        &self,
        membership_id: Uuid,
        role: MemberRole,
    ) -> anyhow::Result<()> {
        let mut rows = self.memberships.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.id == membership_id)
            .ok_or_else(|| anyhow::anyhow!("membership {} not found", membership_id))?;
        row.role = role.to_string();
        Ok(())
    }

    async fn get_workspace(&self, workspace_id: Uuid) -> anyhow::Result<Option<Workspace>> {
        Ok(self
            .workspaces
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == workspace_id)
            .cloned())
    }

    async fn list_workspaces(&self) -> anyhow::Result<Vec<Workspace>> {
        let mut all = self.workspaces.lock().unwrap().clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn list_connections(&self) -> anyhow::Result<Vec<WhatsAppConnection>> {
        Ok(self.connections.lock().unwrap().clone())
    }

    async fn workspace_summary(
        &self,
        _workspace_id: Uuid,
    ) -> anyhow::Result<Option<WorkspaceSummary>> {
        Ok(None)
    }
}

pub struct StaticGateway(pub Vec<GatewayInstance>);

#[async_trait]
impl GatewayClient for StaticGateway {
    async fn fetch_instances(&self) -> anyhow::Result<Vec<GatewayInstance>> {
        Ok(self.0.clone())
    }
}
