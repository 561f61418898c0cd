//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod agent;
mod execution;
mod pipeline;
mod plugin;
mod schedule;

pub use agent::AgentCommands;
pub use execution::ExecutionCommands;
pub use pipeline::PipelineCommands;
pub use plugin::PluginCommands;
pub use schedule::ScheduleCommands;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use serde_json::Value as JsonValue;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline management
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Agent registry and delegation history
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Trigger and inspect executions
    Execution {
        #[command(subcommand)]
        command: ExecutionCommands,
    },
    /// Cron schedules
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    /// Sandboxed plugin steps
    Plugin {
        #[command(subcommand)]
        command: PluginCommands,
    },
    /// Run one scheduler tick now
    Dispatch,
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Agent { command } => agent::handle_agent_command(command, config).await,
        Commands::Execution { command } => {
            execution::handle_execution_command(command, config).await
        }
        Commands::Schedule { command } => schedule::handle_schedule_command(command, config).await,
        Commands::Plugin { command } => plugin::handle_plugin_command(command, config).await,
        Commands::Dispatch => schedule::dispatch(config).await,
    }
}

/// Parses an inline input argument
///
/// Valid JSON is taken as-is; anything else becomes a JSON string, so
/// `--input "write a haiku"` works without quoting.
pub(crate) fn parse_input(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

/// Reads a file from disk, naming it in the error
pub(crate) fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
}

pub(crate) fn print_empty(what: &str) {
    println!("{}", format!("No {} found.", what).yellow());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_input_json() {
        assert_eq!(parse_input(r#"{"topic": "rust"}"#), json!({"topic": "rust"}));
        assert_eq!(parse_input("42"), json!(42));
    }

    #[test]
    fn test_parse_input_plain_text() {
        assert_eq!(parse_input("write a haiku"), json!("write a haiku"));
    }
}
