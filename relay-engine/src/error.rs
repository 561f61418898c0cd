//! Engine error type

use relay_core::domain::execution::TransitionError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl EngineError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("{} {}", kind, id))
    }
}
