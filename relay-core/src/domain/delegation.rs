//! Delegation domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One agent-to-agent sub-call
///
/// Created only when a genuine attempt is made, updated exactly once to a
/// terminal status, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub id: Uuid,
    pub from_agent_id: Uuid,
    pub to_agent_id: Uuid,
    pub caller_user_id: String,
    pub message: String,
    pub response: Option<String>,
    pub status: DelegationStatus,
    pub depth: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Delegation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    Pending,
    Completed,
    Failed,
}

impl DelegationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DelegationStatus::Pending => "pending",
            DelegationStatus::Completed => "completed",
            DelegationStatus::Failed => "failed",
        }
    }
}

impl Delegation {
    /// A new delegation awaiting the target agent
    pub fn pending(
        from_agent_id: Uuid,
        to_agent_id: Uuid,
        caller_user_id: impl Into<String>,
        message: impl Into<String>,
        depth: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_agent_id,
            to_agent_id,
            caller_user_id: caller_user_id.into(),
            message: message.into(),
            response: None,
            status: DelegationStatus::Pending,
            depth,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, response: impl Into<String>) {
        self.settle(DelegationStatus::Completed, response.into());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.settle(DelegationStatus::Failed, error.into());
    }

    fn settle(&mut self, status: DelegationStatus, text: String) {
        self.status = status;
        self.response = Some(text);
        self.completed_at = Some(Utc::now());
    }
}
