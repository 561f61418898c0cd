//! Plugin command handlers
//!
//! Plugin steps are Lua fragments. Validation, local runs and editor stubs
//! use the same sandbox as the orchestrator, so a fragment can be tried
//! without a running server.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use relay_client::OrchestratorClient;
use relay_core::domain::plugin::{PluginRunResult, PluginStep};
use relay_core::dto::plugin::{CreatePlugin, UpdatePlugin};
use serde_json::Value as JsonValue;

use crate::commands::{parse_input, print_empty, read_file};
use crate::config::Config;
use crate::display::{check, print_log_entry, render_json};
use crate::id_resolver::resolve_plugin_id;

/// Plugin subcommands
#[derive(Subcommand)]
pub enum PluginCommands {
    /// Store a plugin from a Lua file
    Create {
        #[arg(short, long)]
        name: String,

        /// Path to the Lua fragment
        #[arg(short, long)]
        file: String,

        /// Path to a JSON document describing the expected input
        #[arg(short, long)]
        schema: Option<String>,

        /// Store the plugin disabled
        #[arg(long)]
        disabled: bool,
    },
    /// List all plugins
    List,
    /// Get plugin details, including its code
    Get {
        /// Plugin ID or unambiguous prefix
        id: String,
    },
    /// Replace a plugin's code or toggle it
    Update {
        /// Plugin ID or unambiguous prefix
        id: String,

        /// New Lua fragment
        #[arg(short, long)]
        file: Option<String>,

        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        #[arg(long)]
        disable: bool,
    },
    /// Check that a Lua file compiles
    Validate {
        /// Path to the Lua fragment
        file: String,

        /// Ask the orchestrator instead of validating locally
        #[arg(long)]
        remote: bool,
    },
    /// Run a fragment against an input
    Run {
        /// Stored plugin ID or prefix; runs on the orchestrator
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        id: Option<String>,

        /// Local Lua file; runs in a local sandbox
        #[arg(short, long)]
        file: Option<String>,

        /// Input as JSON, or plain text
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Write LuaLS stubs for the sandbox globals
    Stubs {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: String,
    },
}

pub async fn handle_plugin_command(command: PluginCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        PluginCommands::Create {
            name,
            file,
            schema,
            disabled,
        } => {
            let input_schema = match schema {
                Some(path) => serde_json::from_str(&read_file(&path)?)
                    .with_context(|| format!("Failed to parse input schema: {}", path))?,
                None => JsonValue::Null,
            };
            let req = CreatePlugin {
                name,
                code: read_file(&file)?,
                input_schema,
                enabled: !disabled,
            };
            create_plugin(&client, &req).await
        }
        PluginCommands::List => list_plugins(&client).await,
        PluginCommands::Get { id } => get_plugin(&client, &id).await,
        PluginCommands::Update {
            id,
            file,
            enable,
            disable,
        } => {
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            if file.is_none() && enabled.is_none() {
                bail!("Nothing to update: pass --file, --enable or --disable");
            }
            let req = UpdatePlugin {
                code: file.as_deref().map(read_file).transpose()?,
                input_schema: None,
                enabled,
            };
            update_plugin(&client, &id, &req).await
        }
        PluginCommands::Validate { file, remote } => validate(&client, &file, remote).await,
        PluginCommands::Run { id, file, input } => {
            let input = input.as_deref().map(parse_input).unwrap_or(JsonValue::Null);
            let result = match (id, file) {
                (_, Some(path)) => relay_lua::execute(&read_file(&path)?, input).await,
                (Some(id), None) => {
                    let uuid = resolve_plugin_id(&client, &id).await?;
                    client.run_plugin(uuid, input).await?
                }
                (None, None) => bail!("Pass a plugin ID or --file"),
            };
            print_run_result(&result);
            Ok(())
        }
        PluginCommands::Stubs { output } => write_stubs(Path::new(&output)),
    }
}

async fn create_plugin(client: &OrchestratorClient, req: &CreatePlugin) -> Result<()> {
    let plugin = client.create_plugin(req).await?;

    println!("{}", "✓ Plugin stored successfully!".green().bold());
    println!("  ID:   {}", plugin.id.to_string().cyan());
    println!("  Name: {}", plugin.name.bold());

    Ok(())
}

async fn list_plugins(client: &OrchestratorClient) -> Result<()> {
    let plugins = client.list_plugins().await?;

    if plugins.is_empty() {
        print_empty("plugins");
        return Ok(());
    }

    println!("{}", format!("Found {} plugin(s):", plugins.len()).bold());
    println!();
    for plugin in plugins {
        print_plugin_summary(&plugin);
    }

    Ok(())
}

async fn get_plugin(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_plugin_id(client, id).await?;
    let plugin = client.get_plugin(uuid).await?;

    println!("{}", "Plugin Details:".bold());
    println!("  ID:      {}", plugin.id.to_string().cyan());
    println!("  Name:    {}", plugin.name.bold());
    println!("  Enabled: {}", plugin.enabled);
    println!(
        "  Created: {}",
        plugin.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if !plugin.input_schema.is_null() {
        println!("\n{}", "Input schema:".bold());
        println!("{}", render_json(&plugin.input_schema));
    }

    println!("\n{}", "Code:".bold());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", plugin.code);
    println!("{}", "─".repeat(80).dimmed());

    Ok(())
}

async fn update_plugin(client: &OrchestratorClient, id: &str, req: &UpdatePlugin) -> Result<()> {
    let uuid = resolve_plugin_id(client, id).await?;
    let plugin = client.update_plugin(uuid, req).await?;

    println!("{}", "✓ Plugin updated!".green().bold());
    print_plugin_summary(&plugin);

    Ok(())
}

async fn validate(client: &OrchestratorClient, path: &str, remote: bool) -> Result<()> {
    let code = read_file(path)?;

    let outcome = if remote {
        let report = client.validate_plugin(code).await?;
        if report.valid {
            Ok(())
        } else {
            Err(report.error.unwrap_or_else(|| "invalid fragment".to_string()))
        }
    } else {
        relay_lua::validate(&code).map_err(|e| e.to_string())
    };

    match outcome {
        Ok(()) => {
            println!("{} {} compiles", check(true), path.bold());
            Ok(())
        }
        Err(error) => {
            println!("{} {}", check(false), path.bold());
            bail!("{}", error)
        }
    }
}

fn write_stubs(output_dir: &Path) -> Result<()> {
    let stubs_dir = output_dir.join(".relay").join("stubs");
    fs::create_dir_all(&stubs_dir)
        .with_context(|| format!("Failed to create stubs directory at {:?}", stubs_dir))?;

    let stub_path = stubs_dir.join("plugin.lua");
    fs::write(&stub_path, relay_lua::generate_stubs())
        .with_context(|| format!("Failed to write stub file {:?}", stub_path))?;

    println!("  {} {}", "Created".green(), stub_path.display());
    println!(
        "  Add {} to your LuaLS workspace.library",
        stubs_dir.display().to_string().cyan()
    );

    Ok(())
}

fn print_run_result(result: &PluginRunResult) {
    if !result.logs.is_empty() {
        println!("{}", "Logs:".bold());
        println!("{}", "─".repeat(80).dimmed());
        for log in &result.logs {
            print_log_entry(log);
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    println!("  Success: {}", check(result.success));
    if let Some(output) = &result.output {
        println!("\n{}", "Output:".bold());
        println!("{}", render_json(output));
    }
    if let Some(error) = &result.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn print_plugin_summary(plugin: &PluginStep) {
    let state = if plugin.enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };

    println!("  {} {} ({})", "▸".cyan(), plugin.name.bold(), state);
    println!("    ID:      {}", plugin.id.to_string().dimmed());
    println!(
        "    Created: {}",
        plugin.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
    println!();
}
