//! Agent command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use relay_client::OrchestratorClient;
use relay_core::domain::agent::Agent;
use relay_core::domain::delegation::{Delegation, DelegationStatus};
use relay_core::dto::agent::CreateAgent;
use relay_core::dto::delegation::DelegateRequest;

use crate::commands::{print_empty, read_file};
use crate::config::Config;
use crate::id_resolver::resolve_agent_id;

/// Agent subcommands
#[derive(Subcommand)]
pub enum AgentCommands {
    /// Register a new agent
    Create {
        #[arg(short, long)]
        name: String,

        /// Model identifier passed to the agent runner
        #[arg(short, long)]
        model: String,

        #[arg(short, long)]
        owner: String,

        /// Inline system instructions
        #[arg(short, long, conflicts_with = "instructions_file")]
        instructions: Option<String>,

        /// Read system instructions from a file
        #[arg(long)]
        instructions_file: Option<String>,

        /// Register the agent disabled
        #[arg(long)]
        disabled: bool,
    },
    /// List all agents
    List,
    /// Get agent details
    Get {
        /// Agent ID or unambiguous prefix
        id: String,
    },
    /// Enable an agent
    Enable {
        /// Agent ID or unambiguous prefix
        id: String,
    },
    /// Disable an agent
    Disable {
        /// Agent ID or unambiguous prefix
        id: String,
    },
    /// Show delegation history for an agent
    Delegations {
        /// Agent ID or unambiguous prefix
        id: String,
    },
    /// Delegate a message from one agent to another
    Delegate {
        /// Delegating agent ID or prefix
        #[arg(long)]
        from: String,

        /// Target agent ID or prefix
        #[arg(long)]
        to: String,

        /// User on whose behalf the delegation runs
        #[arg(long)]
        caller: String,

        message: String,
    },
}

pub async fn handle_agent_command(command: AgentCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        AgentCommands::Create {
            name,
            model,
            owner,
            instructions,
            instructions_file,
            disabled,
        } => {
            let instructions = match instructions_file {
                Some(path) => read_file(&path)?,
                None => instructions.unwrap_or_default(),
            };
            let req = CreateAgent {
                name,
                owner_id: owner,
                model,
                instructions,
                enabled: !disabled,
            };
            create_agent(&client, &req).await
        }
        AgentCommands::List => list_agents(&client).await,
        AgentCommands::Get { id } => get_agent(&client, &id).await,
        AgentCommands::Enable { id } => set_enabled(&client, &id, true).await,
        AgentCommands::Disable { id } => set_enabled(&client, &id, false).await,
        AgentCommands::Delegations { id } => list_delegations(&client, &id).await,
        AgentCommands::Delegate {
            from,
            to,
            caller,
            message,
        } => delegate(&client, &from, &to, caller, message).await,
    }
}

async fn create_agent(client: &OrchestratorClient, req: &CreateAgent) -> Result<()> {
    let agent = client.create_agent(req).await?;

    println!("{}", "✓ Agent registered successfully!".green().bold());
    println!("  ID:    {}", agent.id.to_string().cyan());
    println!("  Name:  {}", agent.name.bold());
    println!("  Model: {}", agent.model.dimmed());

    Ok(())
}

async fn list_agents(client: &OrchestratorClient) -> Result<()> {
    let agents = client.list_agents().await?;

    if agents.is_empty() {
        print_empty("agents");
        return Ok(());
    }

    println!("{}", format!("Found {} agent(s):", agents.len()).bold());
    println!();
    for agent in agents {
        print_agent_summary(&agent);
    }

    Ok(())
}

async fn get_agent(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_agent_id(client, id).await?;
    let agent = client.get_agent(uuid).await?;

    println!("{}", "Agent Details:".bold());
    println!("  ID:      {}", agent.id.to_string().cyan());
    println!("  Name:    {}", agent.name.bold());
    println!("  Owner:   {}", agent.owner_id);
    println!("  Model:   {}", agent.model);
    println!("  Enabled: {}", agent.enabled);
    println!(
        "  Created: {}",
        agent.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if !agent.instructions.is_empty() {
        println!("\n{}", "Instructions:".bold());
        println!("{}", "─".repeat(80).dimmed());
        println!("{}", agent.instructions);
        println!("{}", "─".repeat(80).dimmed());
    }

    Ok(())
}

async fn set_enabled(client: &OrchestratorClient, id: &str, enabled: bool) -> Result<()> {
    let uuid = resolve_agent_id(client, id).await?;
    let agent = client.set_agent_enabled(uuid, enabled).await?;

    let verb = if agent.enabled { "enabled" } else { "disabled" };
    println!(
        "{}",
        format!("✓ Agent {} {}", agent.name, verb).green().bold()
    );

    Ok(())
}

async fn list_delegations(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_agent_id(client, id).await?;
    let delegations = client.list_delegations(uuid).await?;

    if delegations.is_empty() {
        print_empty("delegations");
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} delegation(s) for agent {}:", delegations.len(), uuid).bold()
    );
    println!();
    for delegation in delegations {
        print_delegation(&delegation);
    }

    Ok(())
}

async fn delegate(
    client: &OrchestratorClient,
    from: &str,
    to: &str,
    caller: String,
    message: String,
) -> Result<()> {
    let req = DelegateRequest {
        from_agent_id: resolve_agent_id(client, from).await?,
        to_agent_id: resolve_agent_id(client, to).await?,
        message,
        caller_user_id: caller,
    };

    let reply = client.delegate(&req).await?;

    println!("{}", "Response:".bold());
    println!("{}", reply.response);

    Ok(())
}

fn print_agent_summary(agent: &Agent) {
    let state = if agent.enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };

    println!("  {} {} ({})", "▸".cyan(), agent.name.bold(), state);
    println!("    ID:    {}", agent.id.to_string().dimmed());
    println!("    Model: {}", agent.model.dimmed());
    println!();
}

fn print_delegation(delegation: &Delegation) {
    let status = match delegation.status {
        DelegationStatus::Pending => delegation.status.as_str().yellow(),
        DelegationStatus::Completed => delegation.status.as_str().green(),
        DelegationStatus::Failed => delegation.status.as_str().red(),
    };

    println!(
        "  {} {} → {} [{}] depth {}",
        "▸".cyan(),
        delegation.from_agent_id.to_string().dimmed(),
        delegation.to_agent_id.to_string().dimmed(),
        status,
        delegation.depth
    );
    println!(
        "    At:       {}",
        delegation.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("    Caller:   {}", delegation.caller_user_id);
    println!("    Message:  {}", delegation.message);
    if let Some(response) = &delegation.response {
        println!("    Response: {}", response.dimmed());
    }
    println!();
}
