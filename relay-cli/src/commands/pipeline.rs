//! Pipeline command handlers
//!
//! Pipelines are defined in JSON files shaped like the create request:
//!
//! ```json
//! {
//!   "name": "launch-copy",
//!   "owner_id": "owner-1",
//!   "strategy": "sequential",
//!   "steps": [
//!     { "kind": "agent", "id": "research", "agent_id": "…", "role": "Researcher" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use relay_client::OrchestratorClient;
use relay_core::domain::pipeline::{Pipeline, PipelineStep};
use relay_core::dto::pipeline::CreatePipeline;

use crate::commands::{print_empty, read_file};
use crate::config::Config;
use crate::id_resolver::resolve_pipeline_id;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Create a new pipeline from a JSON definition
    Create {
        /// Path to the pipeline definition
        #[arg(short, long)]
        file: String,

        /// Override the name from the file
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Store a definition as the next version of a pipeline
    Version {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// Path to the pipeline definition
        #[arg(short, long)]
        file: String,
    },
    /// List all pipelines
    List,
    /// Get pipeline details
    Get {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Delete a pipeline
    Delete {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        PipelineCommands::Create { file, name } => create_pipeline(&client, &file, name).await,
        PipelineCommands::Version { id, file } => create_version(&client, &id, &file).await,
        PipelineCommands::List => list_pipelines(&client).await,
        PipelineCommands::Get { id } => get_pipeline(&client, &id).await,
        PipelineCommands::Delete { id } => delete_pipeline(&client, &id).await,
    }
}

fn load_definition(path: &str) -> Result<CreatePipeline> {
    let content = read_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pipeline definition: {}", path))
}

async fn create_pipeline(
    client: &OrchestratorClient,
    path: &str,
    name_override: Option<String>,
) -> Result<()> {
    let mut req = load_definition(path)?;
    if let Some(name) = name_override {
        req.name = name;
    }

    let pipeline = client.create_pipeline(&req).await?;

    println!("{}", "✓ Pipeline created successfully!".green().bold());
    println!("  ID:       {}", pipeline.id.to_string().cyan());
    println!("  Name:     {}", pipeline.name.bold());
    println!("  Strategy: {}", format!("{:?}", pipeline.strategy).dimmed());
    println!("  Steps:    {}", step_roles(&pipeline.steps).dimmed());
    if let Some(cron) = &pipeline.cron_expression {
        println!("  Cron:     {}", cron.dimmed());
    }

    Ok(())
}

async fn create_version(client: &OrchestratorClient, id: &str, path: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;
    let req = load_definition(path)?;

    let pipeline = client.create_pipeline_version(uuid, &req).await?;

    println!(
        "{}",
        format!("✓ Pipeline version {} created!", pipeline.version)
            .green()
            .bold()
    );
    println!("  ID:       {}", pipeline.id.to_string().cyan());
    println!("  Replaces: {}", uuid.to_string().dimmed());

    Ok(())
}

async fn list_pipelines(client: &OrchestratorClient) -> Result<()> {
    let pipelines = client.list_pipelines().await?;

    if pipelines.is_empty() {
        print_empty("pipelines");
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} pipeline(s):", pipelines.len()).bold()
    );
    println!();
    for pipeline in pipelines {
        print_pipeline_summary(&pipeline);
    }

    Ok(())
}

async fn get_pipeline(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;
    let pipeline = client.get_pipeline(uuid).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

async fn delete_pipeline(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;

    client.delete_pipeline(uuid).await?;

    println!(
        "{}",
        format!("✓ Pipeline {} deleted successfully!", uuid)
            .green()
            .bold()
    );

    Ok(())
}

fn step_roles(steps: &[PipelineStep]) -> String {
    steps
        .iter()
        .map(PipelineStep::role)
        .collect::<Vec<_>>()
        .join(" → ")
}

fn print_pipeline_summary(pipeline: &Pipeline) {
    let active = if pipeline.is_active {
        "active".green()
    } else {
        "inactive".dimmed()
    };

    println!(
        "  {} {} v{} ({})",
        "▸".cyan(),
        pipeline.name.bold(),
        pipeline.version,
        active
    );
    println!("    ID:    {}", pipeline.id.to_string().dimmed());
    println!("    Steps: {}", step_roles(&pipeline.steps).dimmed());
    if let Some(desc) = &pipeline.description {
        println!("    Description: {}", desc.dimmed());
    }
    println!();
}

fn print_pipeline_details(pipeline: &Pipeline) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:          {}", pipeline.id.to_string().cyan());
    println!("  Name:        {}", pipeline.name.bold());
    if let Some(desc) = &pipeline.description {
        println!("  Description: {}", desc);
    }
    println!("  Owner:       {}", pipeline.owner_id);
    println!("  Version:     {}", pipeline.version);
    println!("  Active:      {}", pipeline.is_active);
    println!("  Strategy:    {:?}", pipeline.strategy);
    if let Some(cron) = &pipeline.cron_expression {
        println!("  Cron:        {}", cron);
    }
    println!(
        "  Created:     {}",
        pipeline.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!("\n{}", "Steps:".bold());
    for (index, step) in pipeline.steps.iter().enumerate() {
        match step {
            PipelineStep::Agent {
                id,
                agent_id,
                role,
                prompt,
            } => {
                println!("  {}. {} ({}) agent {}", index + 1, role.bold(), id, agent_id.to_string().dimmed());
                if let Some(prompt) = prompt {
                    println!("     Prompt: {}", prompt.dimmed());
                }
            }
            PipelineStep::Plugin {
                id,
                plugin_id,
                role,
            } => {
                println!("  {}. {} ({}) plugin {}", index + 1, role.bold(), id, plugin_id.to_string().dimmed());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_step_roles_joined_in_order() {
        let steps = vec![
            PipelineStep::Agent {
                id: "r".to_string(),
                agent_id: Uuid::new_v4(),
                role: "Researcher".to_string(),
                prompt: None,
            },
            PipelineStep::Plugin {
                id: "f".to_string(),
                plugin_id: Uuid::new_v4(),
                role: "Formatter".to_string(),
            },
        ];

        assert_eq!(step_roles(&steps), "Researcher → Formatter");
    }

    #[test]
    fn test_definition_file_parses_with_defaults() {
        let definition = r#"{
            "name": "launch-copy",
            "owner_id": "owner-1",
            "steps": [
                {"kind": "agent", "id": "w", "agent_id": "6f1c2a4e-0000-4000-8000-000000000001", "role": "Writer"}
            ]
        }"#;

        let req: CreatePipeline = serde_json::from_str(definition).unwrap();
        assert_eq!(req.steps.len(), 1);
        assert!(req.is_active);
        assert!(req.cron_expression.is_none());
    }
}
