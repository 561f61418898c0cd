//! Repository Module
//!
//! PostgreSQL implementation of the engine's storage traits.
//! Each submodule implements one trait for [`PgStore`].

mod agent;
mod delegation;
mod execution;
mod pipeline;
mod plugin;
mod schedule;

use relay_engine::store::StoreError;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    StoreError::backend(err)
}

/// Error for a stored enum value this build does not know
fn unknown_value(kind: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("unknown {} '{}' in database", kind, value).into())
}

/// Fails an update that matched no row
fn expect_row(rows_affected: u64, kind: &str, id: uuid::Uuid) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(StoreError::Conflict(format!("{} {} does not exist", kind, id)));
    }
    Ok(())
}
