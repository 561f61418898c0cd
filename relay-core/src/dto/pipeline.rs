//! Pipeline DTOs

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{PipelineStep, Strategy};

/// Request to create a new pipeline (or a new version of one)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipeline {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub strategy: Strategy,
    pub steps: Vec<PipelineStep>,
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
