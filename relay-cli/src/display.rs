//! Shared terminal rendering helpers

use colored::*;
use relay_core::domain::execution::{Execution, ExecutionStatus, StepKind, StepResult};
use relay_core::domain::log::{LogEntry, LogLevel};
use serde_json::Value as JsonValue;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn colorize_status(status: ExecutionStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        ExecutionStatus::Pending => label.yellow(),
        ExecutionStatus::Running => label.cyan(),
        ExecutionStatus::Completed => label.green(),
        ExecutionStatus::Failed => label.red(),
        ExecutionStatus::Cancelled => label.dimmed(),
        ExecutionStatus::RateLimited => label.magenta(),
    }
}

pub fn check(ok: bool) -> ColoredString {
    if ok { "✓".green() } else { "✗".red() }
}

/// Pretty JSON, or a bare string without quotes
pub fn render_json(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub fn print_execution_summary(execution: &Execution) {
    println!(
        "  {} Execution {}",
        "▸".cyan(),
        execution.id.to_string().dimmed()
    );
    println!("    Status:  {}", colorize_status(execution.status));
    println!(
        "    Started: {}",
        execution.started_at.format(TIME_FORMAT).to_string().dimmed()
    );
    if let Some(step) = &execution.current_step_id {
        println!("    Step:    {}", step.dimmed());
    }
    println!();
}

pub fn print_execution_details(execution: &Execution) {
    println!("{}", "Execution Details:".bold());
    println!("  ID:          {}", execution.id.to_string().cyan());
    println!("  Pipeline ID: {}", execution.pipeline_id.to_string().dimmed());
    println!("  Status:      {}", colorize_status(execution.status));
    println!("  Started:     {}", execution.started_at.format(TIME_FORMAT));

    if let Some(completed) = execution.completed_at {
        println!("  Completed:   {}", completed.format(TIME_FORMAT));
        let duration = completed.signed_duration_since(execution.started_at);
        println!("  Duration:    {}ms", duration.num_milliseconds());
    }

    if let Some(step) = &execution.current_step_id {
        println!("  Step:        {}", step);
    }

    if let Some(token) = &execution.share_token {
        println!("  Shared:      {}", token.dimmed());
    }

    println!("\n{}", "Input:".bold());
    println!("{}", render_json(&execution.input));

    if !execution.step_results.is_empty() {
        println!("\n{}", "Steps:".bold());
        for result in &execution.step_results {
            print_step_result(result);
        }
    }

    if let Some(output) = &execution.output {
        println!("\n{}", "Output:".bold());
        println!("{}", "─".repeat(80).dimmed());
        println!("{}", render_json(output));
        println!("{}", "─".repeat(80).dimmed());
    }

    if let Some(error) = &execution.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn print_step_result(result: &StepResult) {
    let kind = match result.kind {
        StepKind::Agent => "agent",
        StepKind::Plugin => "plugin",
    };

    println!(
        "  {} {} ({}, {})",
        "▸".cyan(),
        result.step_id.bold(),
        result.role,
        kind.dimmed()
    );
    if result.kind == StepKind::Agent {
        println!(
            "    Tokens:      {} in / {} out",
            result.input_tokens, result.output_tokens
        );
    }
    if result.delegations > 0 {
        println!("    Delegations: {}", result.delegations);
    }
    println!("    {}", result.output.dimmed());
}

pub fn print_log_entry(log: &LogEntry) {
    let level_str = log.level.to_string().to_uppercase();
    let level_colored = match log.level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    println!(
        "{} [{}] {}",
        log.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        log.message
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_string_without_quotes() {
        assert_eq!(render_json(&json!("hello")), "hello");
    }

    #[test]
    fn test_render_object_pretty() {
        let rendered = render_json(&json!({"a": 1}));
        assert!(rendered.contains("\"a\": 1"));
        assert!(rendered.contains('\n'));
    }
}
