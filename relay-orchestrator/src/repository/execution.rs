//! Execution Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::domain::execution::{Execution, ExecutionStatus};
use relay_engine::store::{ExecutionStore, StoreError, StoreResult};
use uuid::Uuid;

use super::{PgStore, db_error, expect_row, unknown_value};

const COLUMNS: &str = "id, pipeline_id, status, input, output, current_step_id, step_results, \
                       error, started_at, completed_at, share_token";

#[async_trait]
impl ExecutionStore for PgStore {
    async fn insert_execution(&self, execution: &Execution) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO executions (
                id, pipeline_id, status, input, output, current_step_id,
                step_results, error, started_at, completed_at, share_token
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(execution.id)
        .bind(execution.pipeline_id)
        .bind(execution.status.as_str())
        .bind(&execution.input)
        .bind(&execution.output)
        .bind(&execution.current_step_id)
        .bind(serde_json::to_value(&execution.step_results)?)
        .bind(&execution.error)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .bind(&execution.share_token)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn save_execution(&self, execution: &Execution) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = $1, output = $2, current_step_id = $3, step_results = $4,
                error = $5, completed_at = $6
            WHERE id = $7
            "#,
        )
        .bind(execution.status.as_str())
        .bind(&execution.output)
        .bind(&execution.current_step_id)
        .bind(serde_json::to_value(&execution.step_results)?)
        .bind(&execution.error)
        .bind(execution.completed_at)
        .bind(execution.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        expect_row(result.rows_affected(), "execution", execution.id)
    }

    async fn find_execution(&self, id: Uuid) -> StoreResult<Option<Execution>> {
        let row = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {} FROM executions WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Execution::try_from).transpose()
    }

    async fn find_execution_by_share_token(&self, token: &str) -> StoreResult<Option<Execution>> {
        let row = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {} FROM executions WHERE share_token = $1",
            COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Execution::try_from).transpose()
    }

    async fn list_executions_for_pipeline(&self, pipeline_id: Uuid) -> StoreResult<Vec<Execution>> {
        let rows = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {} FROM executions WHERE pipeline_id = $1 ORDER BY started_at DESC",
            COLUMNS
        ))
        .bind(pipeline_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Execution::try_from).collect()
    }

    async fn set_share_token(&self, id: Uuid, token: Option<String>) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE executions SET share_token = $1 WHERE id = $2")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn string_to_status(s: &str) -> StoreResult<ExecutionStatus> {
    Ok(match s {
        "pending" => ExecutionStatus::Pending,
        "running" => ExecutionStatus::Running,
        "completed" => ExecutionStatus::Completed,
        "failed" => ExecutionStatus::Failed,
        "cancelled" => ExecutionStatus::Cancelled,
        "rate_limited" => ExecutionStatus::RateLimited,
        other => return Err(unknown_value("execution status", other)),
    })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    id: Uuid,
    pipeline_id: Uuid,
    status: String,
    input: serde_json::Value,
    output: Option<serde_json::Value>,
    current_step_id: Option<String>,
    step_results: serde_json::Value,
    error: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    share_token: Option<String>,
}

impl TryFrom<ExecutionRow> for Execution {
    type Error = StoreError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        Ok(Execution {
            id: row.id,
            pipeline_id: row.pipeline_id,
            status: string_to_status(&row.status)?,
            input: row.input,
            output: row.output,
            current_step_id: row.current_step_id,
            step_results: serde_json::from_value(row.step_results)?,
            error: row.error,
            started_at: row.started_at,
            completed_at: row.completed_at,
            share_token: row.share_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
            ExecutionStatus::RateLimited,
        ] {
            assert_eq!(string_to_status(status.as_str()).unwrap(), status);
        }
        assert!(string_to_status("Queued").is_err());
    }
}
