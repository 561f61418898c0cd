//! Plugin step service
//!
//! Code is compiled (never run) before it is stored or replaced, so broken
//! fragments are rejected at edit time instead of failing a pipeline later.

use std::sync::Arc;

use chrono::Utc;
use relay_core::domain::plugin::{PluginRunResult, PluginStep};
use relay_core::dto::plugin::{CreatePlugin, UpdatePlugin, ValidationReport};
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::Store;

pub struct PluginService {
    store: Arc<dyn Store>,
}

impl PluginService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, req: CreatePlugin) -> Result<PluginStep, EngineError> {
        if req.name.trim().is_empty() {
            return Err(EngineError::Validation("plugin name cannot be empty".to_string()));
        }
        check_code(&req.code)?;

        let plugin = PluginStep {
            id: Uuid::new_v4(),
            name: req.name,
            code: req.code,
            input_schema: req.input_schema,
            enabled: req.enabled,
            created_at: Utc::now(),
        };
        self.store.insert_plugin(&plugin).await?;

        info!("Plugin created: {} ({})", plugin.name, plugin.id);
        Ok(plugin)
    }

    pub async fn update(&self, id: Uuid, req: UpdatePlugin) -> Result<PluginStep, EngineError> {
        let mut plugin = self.get(id).await?;

        if let Some(code) = req.code {
            check_code(&code)?;
            plugin.code = code;
        }
        if let Some(schema) = req.input_schema {
            plugin.input_schema = schema;
        }
        if let Some(enabled) = req.enabled {
            plugin.enabled = enabled;
        }

        self.store.save_plugin(&plugin).await?;
        Ok(plugin)
    }

    pub async fn get(&self, id: Uuid) -> Result<PluginStep, EngineError> {
        self.store
            .find_plugin(id)
            .await?
            .ok_or_else(|| EngineError::not_found("plugin", id))
    }

    pub async fn list(&self) -> Result<Vec<PluginStep>, EngineError> {
        Ok(self.store.list_plugins().await?)
    }

    /// Runs a stored plugin directly, outside any pipeline
    pub async fn run(&self, id: Uuid, input: JsonValue) -> Result<PluginRunResult, EngineError> {
        let plugin = self.get(id).await?;
        if !plugin.enabled {
            return Err(EngineError::InvalidState(format!(
                "plugin '{}' is disabled",
                plugin.name
            )));
        }
        Ok(relay_lua::execute(&plugin.code, input).await)
    }
}

/// Parse-only check, reported rather than raised
pub fn validate_code(code: &str) -> ValidationReport {
    match relay_lua::validate(code) {
        Ok(()) => ValidationReport {
            valid: true,
            error: None,
        },
        Err(e) => ValidationReport {
            valid: false,
            error: Some(e.to_string()),
        },
    }
}

fn check_code(code: &str) -> Result<(), EngineError> {
    relay_lua::validate(code)
        .map_err(|e| EngineError::Validation(format!("plugin code does not compile: {}", e)))
}
