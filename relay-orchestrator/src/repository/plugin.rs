//! Plugin Repository

use async_trait::async_trait;
use relay_core::domain::plugin::PluginStep;
use relay_engine::store::{PluginStore, StoreResult};
use uuid::Uuid;

use super::{PgStore, db_error, expect_row};

#[async_trait]
impl PluginStore for PgStore {
    async fn insert_plugin(&self, plugin: &PluginStep) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO plugins (id, name, code, input_schema, enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(plugin.id)
        .bind(&plugin.name)
        .bind(&plugin.code)
        .bind(&plugin.input_schema)
        .bind(plugin.enabled)
        .bind(plugin.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn save_plugin(&self, plugin: &PluginStep) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE plugins
            SET name = $1, code = $2, input_schema = $3, enabled = $4
            WHERE id = $5
            "#,
        )
        .bind(&plugin.name)
        .bind(&plugin.code)
        .bind(&plugin.input_schema)
        .bind(plugin.enabled)
        .bind(plugin.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        expect_row(result.rows_affected(), "plugin", plugin.id)
    }

    async fn find_plugin(&self, id: Uuid) -> StoreResult<Option<PluginStep>> {
        let row = sqlx::query_as::<_, PluginRow>(
            r#"
            SELECT id, name, code, input_schema, enabled, created_at
            FROM plugins
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_plugins(&self) -> StoreResult<Vec<PluginStep>> {
        let rows = sqlx::query_as::<_, PluginRow>(
            r#"
            SELECT id, name, code, input_schema, enabled, created_at
            FROM plugins
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

#[derive(sqlx::FromRow)]
struct PluginRow {
    id: Uuid,
    name: String,
    code: String,
    input_schema: serde_json::Value,
    enabled: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PluginRow> for PluginStep {
    fn from(row: PluginRow) -> Self {
        PluginStep {
            id: row.id,
            name: row.name,
            code: row.code,
            input_schema: row.input_schema,
            enabled: row.enabled,
            created_at: row.created_at,
        }
    }
}
