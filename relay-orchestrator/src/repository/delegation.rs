//! Delegation Repository
//!
//! Audit rows are inserted once as pending and updated once when settled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::domain::delegation::{Delegation, DelegationStatus};
use relay_engine::store::{DelegationStore, StoreError, StoreResult};
use uuid::Uuid;

use super::{PgStore, db_error, expect_row, unknown_value};

#[async_trait]
impl DelegationStore for PgStore {
    async fn insert_delegation(&self, delegation: &Delegation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO delegations (
                id, from_agent_id, to_agent_id, caller_user_id, message,
                response, status, depth, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(delegation.id)
        .bind(delegation.from_agent_id)
        .bind(delegation.to_agent_id)
        .bind(&delegation.caller_user_id)
        .bind(&delegation.message)
        .bind(&delegation.response)
        .bind(delegation.status.as_str())
        .bind(delegation.depth as i32)
        .bind(delegation.created_at)
        .bind(delegation.completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn save_delegation(&self, delegation: &Delegation) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE delegations
            SET response = $1, status = $2, completed_at = $3
            WHERE id = $4
            "#,
        )
        .bind(&delegation.response)
        .bind(delegation.status.as_str())
        .bind(delegation.completed_at)
        .bind(delegation.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        expect_row(result.rows_affected(), "delegation", delegation.id)
    }

    async fn list_delegations_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<Delegation>> {
        let rows = sqlx::query_as::<_, DelegationRow>(
            r#"
            SELECT id, from_agent_id, to_agent_id, caller_user_id, message,
                   response, status, depth, created_at, completed_at
            FROM delegations
            WHERE from_agent_id = $1 OR to_agent_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Delegation::try_from).collect()
    }
}

fn string_to_status(s: &str) -> StoreResult<DelegationStatus> {
    match s {
        "pending" => Ok(DelegationStatus::Pending),
        "completed" => Ok(DelegationStatus::Completed),
        "failed" => Ok(DelegationStatus::Failed),
        other => Err(unknown_value("delegation status", other)),
    }
}

#[derive(sqlx::FromRow)]
struct DelegationRow {
    id: Uuid,
    from_agent_id: Uuid,
    to_agent_id: Uuid,
    caller_user_id: String,
    message: String,
    response: Option<String>,
    status: String,
    depth: i32,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<DelegationRow> for Delegation {
    type Error = StoreError;

    fn try_from(row: DelegationRow) -> Result<Self, Self::Error> {
        Ok(Delegation {
            id: row.id,
            from_agent_id: row.from_agent_id,
            to_agent_id: row.to_agent_id,
            caller_user_id: row.caller_user_id,
            message: row.message,
            response: row.response,
            status: string_to_status(&row.status)?,
            depth: row.depth.max(0) as u32,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}
