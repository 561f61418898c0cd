//! Schedule command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use relay_client::OrchestratorClient;
use relay_core::cron;
use relay_core::domain::schedule::Schedule;
use relay_core::dto::schedule::{CreateSchedule, UpdateSchedule};

use crate::commands::{parse_input, print_empty};
use crate::config::Config;
use crate::id_resolver::{resolve_pipeline_id, resolve_schedule_id};

/// Schedule subcommands
#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Schedule a pipeline on a cron expression
    Create {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Five-field cron expression, e.g. "*/15 * * * *"
        #[arg(short, long)]
        cron: String,

        #[arg(short, long)]
        label: Option<String>,

        /// Input for every run, as JSON or plain text
        #[arg(short, long)]
        input: Option<String>,

        /// Create the schedule paused
        #[arg(long)]
        paused: bool,
    },
    /// List all schedules
    List,
    /// Change a schedule; omitted options are left as they are
    Update {
        /// Schedule ID or unambiguous prefix
        id: String,

        #[arg(short, long)]
        cron: Option<String>,

        #[arg(short, long)]
        label: Option<String>,

        #[arg(short, long)]
        input: Option<String>,

        #[arg(long, conflicts_with = "resume")]
        pause: bool,

        #[arg(long)]
        resume: bool,
    },
    /// Delete a schedule
    Delete {
        /// Schedule ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_schedule_command(command: ScheduleCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        ScheduleCommands::Create {
            pipeline,
            cron,
            label,
            input,
            paused,
        } => {
            check_expression(&cron)?;
            let req = CreateSchedule {
                pipeline_id: resolve_pipeline_id(&client, &pipeline).await?,
                cron_expression: cron,
                label,
                input_template: input.as_deref().map(parse_input),
                is_active: !paused,
            };
            create_schedule(&client, &req).await
        }
        ScheduleCommands::List => list_schedules(&client).await,
        ScheduleCommands::Update {
            id,
            cron,
            label,
            input,
            pause,
            resume,
        } => {
            if let Some(expression) = &cron {
                check_expression(expression)?;
            }
            let is_active = match (pause, resume) {
                (true, _) => Some(false),
                (_, true) => Some(true),
                _ => None,
            };
            let req = UpdateSchedule {
                cron_expression: cron,
                label,
                input_template: input.as_deref().map(parse_input),
                is_active,
            };
            update_schedule(&client, &id, &req).await
        }
        ScheduleCommands::Delete { id } => delete_schedule(&client, &id).await,
    }
}

/// Rejects malformed expressions before they reach the orchestrator
fn check_expression(expression: &str) -> Result<()> {
    cron::validate(expression)
        .with_context(|| format!("Invalid cron expression '{}'", expression))
}

async fn create_schedule(client: &OrchestratorClient, req: &CreateSchedule) -> Result<()> {
    let schedule = client.create_schedule(req).await?;

    println!("{}", "✓ Schedule created successfully!".green().bold());
    println!("  ID:       {}", schedule.id.to_string().cyan());
    println!("  Cron:     {}", schedule.cron_expression.bold());
    println!(
        "  Next run: {}",
        schedule.next_run_at.format("%Y-%m-%d %H:%M UTC")
    );

    Ok(())
}

async fn list_schedules(client: &OrchestratorClient) -> Result<()> {
    let schedules = client.list_schedules().await?;

    if schedules.is_empty() {
        print_empty("schedules");
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} schedule(s):", schedules.len()).bold()
    );
    println!();
    for schedule in schedules {
        print_schedule_summary(&schedule);
    }

    Ok(())
}

async fn update_schedule(client: &OrchestratorClient, id: &str, req: &UpdateSchedule) -> Result<()> {
    let uuid = resolve_schedule_id(client, id).await?;
    let schedule = client.update_schedule(uuid, req).await?;

    println!("{}", "✓ Schedule updated!".green().bold());
    print_schedule_summary(&schedule);

    Ok(())
}

async fn delete_schedule(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_schedule_id(client, id).await?;

    client.delete_schedule(uuid).await?;

    println!(
        "{}",
        format!("✓ Schedule {} deleted successfully!", uuid)
            .green()
            .bold()
    );

    Ok(())
}

/// Runs one dispatcher tick and reports what fired
pub async fn dispatch(config: &Config) -> Result<()> {
    let client = config.client();
    let report = client.dispatch().await?;

    println!(
        "{}",
        format!("✓ Dispatch triggered {} execution(s)", report.triggered)
            .green()
            .bold()
    );

    if !report.failures.is_empty() {
        println!();
        println!(
            "{}",
            format!("{} failure(s):", report.failures.len()).red().bold()
        );
        for failure in &report.failures {
            let source = match failure.schedule_id {
                Some(schedule_id) => format!("schedule {}", schedule_id),
                None => format!("pipeline {}", failure.pipeline_id),
            };
            println!("  {} {}: {}", "✗".red(), source, failure.error);
        }
    }

    Ok(())
}

fn print_schedule_summary(schedule: &Schedule) {
    let state = if schedule.is_active {
        "active".green()
    } else {
        "paused".dimmed()
    };

    let title = schedule.label.as_deref().unwrap_or(&schedule.cron_expression);
    println!("  {} {} ({})", "▸".cyan(), title.bold(), state);
    println!("    ID:       {}", schedule.id.to_string().dimmed());
    println!("    Pipeline: {}", schedule.pipeline_id.to_string().dimmed());
    println!("    Cron:     {}", schedule.cron_expression);
    println!(
        "    Next run: {}",
        schedule.next_run_at.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(last) = schedule.last_run_at {
        println!("    Last run: {}", last.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_expression() {
        assert!(check_expression("*/15 * * * *").is_ok());
        assert!(check_expression("0 9 * * 1").is_ok());
        assert!(check_expression("every monday").is_err());
        assert!(check_expression("* * * *").is_err());
    }
}
