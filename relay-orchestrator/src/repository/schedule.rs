//! Schedule Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::domain::schedule::Schedule;
use relay_engine::store::{ScheduleStore, StoreResult};
use uuid::Uuid;

use super::{PgStore, db_error, expect_row};

const COLUMNS: &str = "id, pipeline_id, cron_expression, label, input_template, next_run_at, \
                       last_run_at, is_active, created_at";

#[async_trait]
impl ScheduleStore for PgStore {
    async fn insert_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO schedules (
                id, pipeline_id, cron_expression, label, input_template,
                next_run_at, last_run_at, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.pipeline_id)
        .bind(&schedule.cron_expression)
        .bind(&schedule.label)
        .bind(&schedule.input_template)
        .bind(schedule.next_run_at)
        .bind(schedule.last_run_at)
        .bind(schedule.is_active)
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn save_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE schedules
            SET cron_expression = $1, label = $2, input_template = $3,
                next_run_at = $4, last_run_at = $5, is_active = $6
            WHERE id = $7
            "#,
        )
        .bind(&schedule.cron_expression)
        .bind(&schedule.label)
        .bind(&schedule.input_template)
        .bind(schedule.next_run_at)
        .bind(schedule.last_run_at)
        .bind(schedule.is_active)
        .bind(schedule.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        expect_row(result.rows_affected(), "schedule", schedule.id)
    }

    async fn find_schedule(&self, id: Uuid) -> StoreResult<Option<Schedule>> {
        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules ORDER BY next_run_at ASC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_due_schedules(&self, now: DateTime<Utc>) -> StoreResult<Vec<Schedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules WHERE is_active AND next_run_at <= $1 ORDER BY next_run_at ASC",
            COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn claim_schedule(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
        fired_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE schedules
            SET next_run_at = $1, last_run_at = $2
            WHERE id = $3 AND next_run_at = $4
            "#,
        )
        .bind(next_run_at)
        .bind(fired_at)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn repoint_schedules(&self, from: Uuid, to: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE schedules SET pipeline_id = $1 WHERE pipeline_id = $2")
            .bind(to)
            .bind(from)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_schedule(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    pipeline_id: Uuid,
    cron_expression: String,
    label: Option<String>,
    input_template: Option<serde_json::Value>,
    next_run_at: DateTime<Utc>,
    last_run_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Schedule {
            id: row.id,
            pipeline_id: row.pipeline_id,
            cron_expression: row.cron_expression,
            label: row.label,
            input_template: row.input_template,
            next_run_at: row.next_run_at,
            last_run_at: row.last_run_at,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}
