//! Agent Repository

use async_trait::async_trait;
use relay_core::domain::agent::Agent;
use relay_engine::store::{AgentStore, StoreResult};
use uuid::Uuid;

use super::{PgStore, db_error};

#[async_trait]
impl AgentStore for PgStore {
    async fn insert_agent(&self, agent: &Agent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (id, name, owner_id, model, instructions, enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(agent.id)
        .bind(&agent.name)
        .bind(&agent.owner_id)
        .bind(&agent.model)
        .bind(&agent.instructions)
        .bind(agent.enabled)
        .bind(agent.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_agent(&self, id: Uuid) -> StoreResult<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            SELECT id, name, owner_id, model, instructions, enabled, created_at
            FROM agents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        let rows = sqlx::query_as::<_, AgentRow>(
            r#"
            SELECT id, name, owner_id, model, instructions, enabled, created_at
            FROM agents
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn set_agent_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE agents SET enabled = $1 WHERE id = $2")
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: Uuid,
    name: String,
    owner_id: String,
    model: String,
    instructions: String,
    enabled: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Agent {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            model: row.model,
            instructions: row.instructions,
            enabled: row.enabled,
            created_at: row.created_at,
        }
    }
}
