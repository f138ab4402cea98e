use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadops_core::config::SslMode;
use leadops_core::{
    LeadTemperature, MemberRole, Membership, Profile, SubscriptionSummary, UpstreamConfig,
    WhatsAppConnection, Workspace, WorkspaceSummary,
};
use leadops_runtime::TenantStore;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

pub mod schema;

/// Tenant tables over a service-role Postgres connection.
pub struct PostgresStore {
    pool: PgPool,
    /// Type `workspace_members.role` is cast to on writes.
    role_type: String,
}

impl PostgresStore {
    pub async fn connect(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let url = config.connection_string();
        let options = connect_options(&url, config.ssl_mode)?;

        tracing::debug!(
            url = %config.redacted_connection_string(),
            max_connections = config.pool.max_connections,
            "Connecting to Postgres"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.pool.max_connections)
            .acquire_timeout(Duration::from_secs(u64::from(
                config.pool.acquire_timeout_seconds,
            )))
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "failed to connect to {}",
                    config.redacted_connection_string()
                )
            })?;
        let role_type = resolve_role_type(&pool).await?;
        tracing::debug!(role_type = %role_type, "Resolved membership role type");
        Ok(Self { pool, role_type })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `workspace_members.role` may be text or an enum; binds are cast to it.
async fn resolve_role_type(pool: &PgPool) -> anyhow::Result<String> {
    let row: Option<(String, String)> = sqlx::query_as(
        r#"
        select udt_schema::text, udt_name::text
        from information_schema.columns
        where table_schema = 'public'
          and table_name = 'workspace_members'
          and column_name = 'role'
        "#,
    )
    .fetch_optional(pool)
    .await
    .context("failed to read the type of workspace_members.role")?;

    Ok(match row {
        Some((schema, name)) => qualified_type(&schema, &name),
        None => "text".to_string(),
    })
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified_type(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Parse the URL and apply `ssl_mode` unless the URL already sets `sslmode`.
fn connect_options(url: &str, ssl_mode: SslMode) -> anyhow::Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(url)
        .map_err(|e| anyhow::anyhow!("invalid database URL: {}", e))?;
    if url.contains("sslmode=") {
        return Ok(options);
    }
    Ok(options.ssl_mode(pg_ssl_mode(ssl_mode)))
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

const PROFILE_COLUMNS: &str = "id, user_id, email, full_name, workspace_id";
const MEMBER_COLUMNS: &str = "id, workspace_id, user_id, role::text as role, created_at";
const WORKSPACE_COLUMNS: &str = "id, name, owner_id, evolution_instance_name, created_at";
const CONNECTION_COLUMNS: &str = "id, workspace_id, instance_name, status";

fn profile_from_row(row: &PgRow) -> anyhow::Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        workspace_id: row.try_get("workspace_id")?,
    })
}

fn membership_from_row(row: &PgRow) -> anyhow::Result<Membership> {
    Ok(Membership {
        id: row.try_get("id")?,
        workspace_id: row.try_get("workspace_id")?,
        user_id: row.try_get("user_id")?,
        role: row.try_get("role")?,
        created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
    })
}

fn workspace_from_row(row: &PgRow) -> anyhow::Result<Workspace> {
    Ok(Workspace {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        owner_id: row.try_get("owner_id")?,
        evolution_instance_name: row.try_get("evolution_instance_name")?,
        created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
    })
}

fn connection_from_row(row: &PgRow) -> anyhow::Result<WhatsAppConnection> {
    Ok(WhatsAppConnection {
        id: row.try_get("id")?,
        workspace_id: row.try_get("workspace_id")?,
        instance_name: row.try_get("instance_name")?,
        status: row.try_get("status")?,
    })
}

#[async_trait]
impl TenantStore for PostgresStore {
    async fn list_profiles_with_workspace(&self) -> anyhow::Result<Vec<Profile>> {
        let sql = format!(
            "select {} from profiles where workspace_id is not null order by id",
            PROFILE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(profile_from_row).collect()
    }

    async fn find_profile_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>> {
        let sql = format!(
            "select {} from profiles where lower(email) = lower($1) order by id limit 1",
            PROFILE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn find_memberships(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<Membership>> {
        let sql = format!(
            "select {} from workspace_members where workspace_id = $1 and user_id = $2 order by created_at nulls last, id",
            MEMBER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(workspace_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(membership_from_row).collect()
    }

    async fn insert_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> anyhow::Result<Membership> {
        let sql = format!(
            "insert into workspace_members (workspace_id, user_id, role) values ($1, $2, $3::{}) returning {}",
            self.role_type, MEMBER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(workspace_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;
        membership_from_row(&row)
    }

    async fn update_membership_role(
        &self,
        membership_id: Uuid,
        role: MemberRole,
    ) -> anyhow::Result<()> {
        let sql = format!(
            "update workspace_members set role = $2::{} where id = $1",
            self.role_type
        );
        let result = sqlx::query(&sql)
            .bind(membership_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() != 1 {
            anyhow::bail!(
                "expected to update 1 membership row, updated {}",
                result.rows_affected()
            );
        }
        Ok(())
    }

    async fn get_workspace(&self, workspace_id: Uuid) -> anyhow::Result<Option<Workspace>> {
        let sql = format!("select {} from workspaces where id = $1", WORKSPACE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(workspace_from_row).transpose()
    }

    async fn list_workspaces(&self) -> anyhow::Result<Vec<Workspace>> {
        let sql = format!("select {} from workspaces order by name, id", WORKSPACE_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(workspace_from_row).collect()
    }

    async fn list_connections(&self) -> anyhow::Result<Vec<WhatsAppConnection>> {
        let sql = format!(
            "select {} from whatsapp_connections order by workspace_id, instance_name",
            CONNECTION_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(connection_from_row).collect()
    }

    async fn workspace_summary(
        &self,
        workspace_id: Uuid,
    ) -> anyhow::Result<Option<WorkspaceSummary>> {
        let Some(workspace) = self.get_workspace(workspace_id).await? else {
            return Ok(None);
        };

        let sql = format!(
            "select {} from workspace_members where workspace_id = $1 order by created_at nulls last, id",
            MEMBER_COLUMNS
        );
        let members = sqlx::query(&sql)
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(membership_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let sql = format!(
            "select {} from whatsapp_connections where workspace_id = $1 order by instance_name",
            CONNECTION_COLUMNS
        );
        let connections = sqlx::query(&sql)
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(connection_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let sql = format!(
            "select {} from profiles where workspace_id = $1 order by id",
            PROFILE_COLUMNS
        );
        let profiles = sqlx::query(&sql)
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(profile_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let (lead_count, hot_lead_count): (i64, i64) = sqlx::query_as(
            r#"
            select count(*), count(*) filter (where temperature::text = $2)
            from leads
            where workspace_id = $1
            "#,
        )
        .bind(workspace_id)
        .bind(LeadTemperature::Hot.as_str())
        .fetch_one(&self.pool)
        .await?;

        let subscription = sqlx::query(
            r#"
            select plan_id::text as plan_id, coalesce(status::text, 'unknown') as status
            from workspace_subscriptions
            where workspace_id = $1
            limit 1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| -> anyhow::Result<SubscriptionSummary> {
            Ok(SubscriptionSummary {
                plan_id: row.try_get("plan_id")?,
                status: row.try_get("status")?,
            })
        })
        .transpose()?;

        Ok(Some(WorkspaceSummary {
            workspace,
            members,
            connections,
            lead_count,
            hot_lead_count,
            subscription,
            profiles,
        }))
    }
}
