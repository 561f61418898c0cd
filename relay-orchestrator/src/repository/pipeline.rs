//! Pipeline Repository

use async_trait::async_trait;
use relay_core::domain::pipeline::{Pipeline, Strategy};
use relay_engine::store::{PipelineStore, StoreError, StoreResult};
use uuid::Uuid;

use super::{PgStore, db_error, unknown_value};

const COLUMNS: &str = "id, name, description, owner_id, strategy, steps, cron_expression, \
                       is_active, version, created_at";

#[async_trait]
impl PipelineStore for PgStore {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pipelines (
                id, name, description, owner_id, strategy, steps,
                cron_expression, is_active, version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(pipeline.id)
        .bind(&pipeline.name)
        .bind(&pipeline.description)
        .bind(&pipeline.owner_id)
        .bind(strategy_to_string(pipeline.strategy))
        .bind(serde_json::to_value(&pipeline.steps)?)
        .bind(&pipeline.cron_expression)
        .bind(pipeline.is_active)
        .bind(pipeline.version as i32)
        .bind(pipeline.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<Pipeline>> {
        let row = sqlx::query_as::<_, PipelineRow>(&format!(
            "SELECT {} FROM pipelines WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Pipeline::try_from).transpose()
    }

    async fn list_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        let rows = sqlx::query_as::<_, PipelineRow>(&format!(
            "SELECT {} FROM pipelines ORDER BY created_at DESC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Pipeline::try_from).collect()
    }

    async fn set_pipeline_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE pipelines SET is_active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_pipeline(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_cron_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        let rows = sqlx::query_as::<_, PipelineRow>(&format!(
            "SELECT {} FROM pipelines WHERE is_active AND cron_expression IS NOT NULL",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Pipeline::try_from).collect()
    }
}

fn strategy_to_string(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Sequential => "sequential",
        Strategy::Parallel => "parallel",
    }
}

fn string_to_strategy(s: &str) -> StoreResult<Strategy> {
    match s {
        "sequential" => Ok(Strategy::Sequential),
        "parallel" => Ok(Strategy::Parallel),
        other => Err(unknown_value("strategy", other)),
    }
}

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    owner_id: String,
    strategy: String,
    steps: serde_json::Value,
    cron_expression: Option<String>,
    is_active: bool,
    version: i32,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = StoreError;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        Ok(Pipeline {
            id: row.id,
            name: row.name,
            description: row.description,
            owner_id: row.owner_id,
            strategy: string_to_strategy(&row.strategy)?,
            steps: serde_json::from_value(row.steps)?,
            cron_expression: row.cron_expression,
            is_active: row.is_active,
            version: row.version.max(1) as u32,
            created_at: row.created_at,
        })
    }
}
