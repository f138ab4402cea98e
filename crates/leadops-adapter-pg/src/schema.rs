use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, BTreeSet};

/// Columns the store reads or writes, per table in the `public` schema.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("profiles", &["id", "user_id", "email", "full_name", "workspace_id"]),
    (
        "workspace_members",
        &["id", "workspace_id", "user_id", "role", "created_at"],
    ),
    (
        "workspaces",
        &["id", "name", "owner_id", "evolution_instance_name", "created_at"],
    ),
    (
        "whatsapp_connections",
        &["id", "workspace_id", "instance_name", "status"],
    ),
    ("leads", &["workspace_id", "temperature"]),
    ("workspace_subscriptions", &["workspace_id", "plan_id", "status"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCheck {
    pub server_version: String,
    pub missing_tables: Vec<String>,
    /// `table.column` entries.
    pub missing_columns: Vec<String>,
}

impl SchemaCheck {
    pub fn is_ok(&self) -> bool {
        self.missing_tables.is_empty() && self.missing_columns.is_empty()
    }
}

/// Compare `information_schema` against [`REQUIRED_COLUMNS`].
pub async fn check_schema(pool: &PgPool) -> anyhow::Result<SchemaCheck> {
    let (server_version,): (String,) = sqlx::query_as("select version()").fetch_one(pool).await?;

    let tables: Vec<String> = REQUIRED_COLUMNS.iter().map(|(t, _)| t.to_string()).collect();
    let rows = sqlx::query(
        r#"
        select table_name::text as table_name, column_name::text as column_name
        from information_schema.columns
        where table_schema = 'public' and table_name::text = any($1)
        "#,
    )
    .bind(tables)
    .fetch_all(pool)
    .await?;

    let mut present: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        let table: String = row.try_get("table_name")?;
        let column: String = row.try_get("column_name")?;
        present.entry(table).or_default().insert(column);
    }

    let mut check = diff_columns(&present);
    check.server_version = server_version;
    Ok(check)
}

fn diff_columns(present: &BTreeMap<String, BTreeSet<String>>) -> SchemaCheck {
    let mut check = SchemaCheck::default();
    for (table, columns) in REQUIRED_COLUMNS {
        let Some(found) = present.get(*table) else {
            check.missing_tables.push(table.to_string());
            continue;
        };
        for column in *columns {
            if !found.contains(*column) {
                check.missing_columns.push(format!("{}.{}", table, column));
            }
        }
    }
    check
}
