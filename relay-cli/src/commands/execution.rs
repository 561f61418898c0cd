//! Execution command handlers
//!
//! Triggering, polling, cancelling and sharing pipeline executions.

use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use relay_client::OrchestratorClient;
use relay_core::domain::execution::{Execution, ExecutionStatus};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::commands::{parse_input, print_empty, read_file};
use crate::config::Config;
use crate::display::{colorize_status, print_execution_details, print_execution_summary};
use crate::id_resolver::{resolve_execution_id, resolve_pipeline_id};

/// Execution subcommands
#[derive(Subcommand)]
pub enum ExecutionCommands {
    /// Trigger a pipeline
    Run {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Input as JSON, or plain text
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read the input from a JSON file
        #[arg(long)]
        input_file: Option<String>,

        /// Poll until the execution settles
        #[arg(short, long)]
        watch: bool,

        /// Poll interval in milliseconds for --watch
        #[arg(long, default_value = "1000")]
        interval: u64,
    },
    /// List executions of a pipeline
    List {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,
    },
    /// Get execution details
    Get {
        /// Execution ID, or a prefix together with --pipeline
        id: String,

        #[arg(short, long)]
        pipeline: Option<String>,
    },
    /// Ask a running execution to stop before its next step
    Cancel {
        id: String,

        #[arg(short, long)]
        pipeline: Option<String>,
    },
    /// Create a public read-only link
    Share {
        id: String,

        #[arg(short, long)]
        pipeline: Option<String>,
    },
    /// Revoke the public link
    Unshare {
        id: String,

        #[arg(short, long)]
        pipeline: Option<String>,
    },
    /// Open a shared execution by token
    Shared { token: String },
}

pub async fn handle_execution_command(command: ExecutionCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        ExecutionCommands::Run {
            pipeline,
            input,
            input_file,
            watch,
            interval,
        } => {
            let input = match input_file {
                Some(path) => serde_json::from_str(&read_file(&path)?)?,
                None => input.as_deref().map(parse_input).unwrap_or(JsonValue::Null),
            };
            run(&client, &pipeline, input, watch, Duration::from_millis(interval)).await
        }
        ExecutionCommands::List { pipeline } => list_executions(&client, &pipeline).await,
        ExecutionCommands::Get { id, pipeline } => {
            let uuid = resolve_execution_id(&client, pipeline.as_deref(), &id).await?;
            let execution = client.get_execution(uuid).await?;
            print_execution_details(&execution);
            Ok(())
        }
        ExecutionCommands::Cancel { id, pipeline } => {
            let uuid = resolve_execution_id(&client, pipeline.as_deref(), &id).await?;
            client.cancel_execution(uuid).await?;
            println!(
                "{}",
                format!("✓ Cancellation requested for {}", uuid).green().bold()
            );
            Ok(())
        }
        ExecutionCommands::Share { id, pipeline } => {
            let uuid = resolve_execution_id(&client, pipeline.as_deref(), &id).await?;
            let link = client.share_execution(uuid).await?;
            println!("{}", "✓ Execution shared!".green().bold());
            println!(
                "  Link: {}",
                format!("{}/shared/{}", client.base_url(), link.token).cyan()
            );
            Ok(())
        }
        ExecutionCommands::Unshare { id, pipeline } => {
            let uuid = resolve_execution_id(&client, pipeline.as_deref(), &id).await?;
            client.unshare_execution(uuid).await?;
            println!("{}", format!("✓ Share link for {} revoked", uuid).green().bold());
            Ok(())
        }
        ExecutionCommands::Shared { token } => {
            let execution = client.get_shared_execution(&token).await?;
            print_execution_details(&execution);
            Ok(())
        }
    }
}

async fn run(
    client: &OrchestratorClient,
    pipeline: &str,
    input: JsonValue,
    watch: bool,
    interval: Duration,
) -> Result<()> {
    let pipeline_id = resolve_pipeline_id(client, pipeline).await?;
    let execution = client.trigger_execution(pipeline_id, input).await?;

    println!("{}", "✓ Execution queued!".green().bold());
    println!("  Execution ID: {}", execution.id.to_string().cyan());
    println!("  Pipeline ID:  {}", execution.pipeline_id.to_string().dimmed());

    if !watch {
        return Ok(());
    }

    println!();
    let finished = watch_execution(client, execution.id, interval).await?;
    println!();
    print_execution_details(&finished);

    Ok(())
}

/// Polls until the execution reaches a terminal status
///
/// Prints a line whenever the status or the current step changes.
async fn watch_execution(
    client: &OrchestratorClient,
    execution_id: Uuid,
    interval: Duration,
) -> Result<Execution> {
    let mut last_seen: Option<(ExecutionStatus, Option<String>)> = None;

    loop {
        let execution = client.get_execution(execution_id).await?;

        let seen = (execution.status, execution.current_step_id.clone());
        if last_seen.as_ref() != Some(&seen) {
            match &execution.current_step_id {
                Some(step) => println!(
                    "  {} {} at step {}",
                    "•".cyan(),
                    colorize_status(execution.status),
                    step.bold()
                ),
                None => println!("  {} {}", "•".cyan(), colorize_status(execution.status)),
            }
            last_seen = Some(seen);
        }

        if execution.status.is_terminal() {
            return Ok(execution);
        }

        tokio::time::sleep(interval).await;
    }
}

async fn list_executions(client: &OrchestratorClient, pipeline: &str) -> Result<()> {
    let pipeline_id = resolve_pipeline_id(client, pipeline).await?;
    let executions = client.list_executions(pipeline_id).await?;

    if executions.is_empty() {
        print_empty("executions");
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Found {} execution(s) for pipeline {}:",
            executions.len(),
            pipeline_id
        )
        .bold()
    );
    println!();
    for execution in executions {
        print_execution_summary(&execution);
    }

    Ok(())
}
