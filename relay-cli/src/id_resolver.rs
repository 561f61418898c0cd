//! ID resolver module
//!
//! Lets users type short, unambiguous prefixes instead of full UUIDs.
//! Full UUIDs are used as-is; prefixes are matched against the matching
//! list endpoint.

use anyhow::{Context, Result, anyhow};
use relay_client::OrchestratorClient;
use uuid::Uuid;

/// Identifier that can be either a full UUID or an unambiguous prefix
#[derive(Debug, Clone)]
pub enum IdOrPrefix {
    Full(Uuid),
    Prefix(String),
}

impl IdOrPrefix {
    /// Parses as a full UUID first, otherwise treats the input as a prefix
    pub fn parse(input: &str) -> Self {
        match Uuid::parse_str(input) {
            Ok(uuid) => IdOrPrefix::Full(uuid),
            Err(_) => IdOrPrefix::Prefix(input.trim().to_lowercase()),
        }
    }
}

impl std::fmt::Display for IdOrPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdOrPrefix::Full(uuid) => write!(f, "{}", uuid),
            IdOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}

/// Picks the single candidate whose ID starts with `prefix`
fn match_prefix(kind: &str, prefix: &str, candidates: impl IntoIterator<Item = Uuid>) -> Result<Uuid> {
    if prefix.is_empty() {
        return Err(anyhow!("Empty {} ID", kind));
    }

    let matches: Vec<Uuid> = candidates
        .into_iter()
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No {} found with ID starting with '{}'", kind, prefix)),
        [only] => Ok(*only),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                prefix,
                kind,
                ids.join(", ")
            ))
        }
    }
}

pub async fn resolve_pipeline_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    let prefix = match IdOrPrefix::parse(input) {
        IdOrPrefix::Full(uuid) => return Ok(uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let pipelines = client
        .list_pipelines()
        .await
        .context("Failed to fetch pipelines for ID resolution")?;

    match_prefix("pipeline", &prefix, pipelines.iter().map(|p| p.id))
}

pub async fn resolve_agent_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    let prefix = match IdOrPrefix::parse(input) {
        IdOrPrefix::Full(uuid) => return Ok(uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let agents = client
        .list_agents()
        .await
        .context("Failed to fetch agents for ID resolution")?;

    match_prefix("agent", &prefix, agents.iter().map(|a| a.id))
}

pub async fn resolve_schedule_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    let prefix = match IdOrPrefix::parse(input) {
        IdOrPrefix::Full(uuid) => return Ok(uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let schedules = client
        .list_schedules()
        .await
        .context("Failed to fetch schedules for ID resolution")?;

    match_prefix("schedule", &prefix, schedules.iter().map(|s| s.id))
}

pub async fn resolve_plugin_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    let prefix = match IdOrPrefix::parse(input) {
        IdOrPrefix::Full(uuid) => return Ok(uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let plugins = client
        .list_plugins()
        .await
        .context("Failed to fetch plugins for ID resolution")?;

    match_prefix("plugin", &prefix, plugins.iter().map(|p| p.id))
}

/// Resolve an execution ID
///
/// Executions are only listed per pipeline, so a prefix needs the pipeline
/// it belongs to.
pub async fn resolve_execution_id(
    client: &OrchestratorClient,
    pipeline: Option<&str>,
    input: &str,
) -> Result<Uuid> {
    let prefix = match IdOrPrefix::parse(input) {
        IdOrPrefix::Full(uuid) => return Ok(uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let Some(pipeline) = pipeline else {
        return Err(anyhow!(
            "'{}' is not a full execution ID; pass --pipeline to resolve a prefix",
            prefix
        ));
    };

    let pipeline_id = resolve_pipeline_id(client, pipeline).await?;
    let executions = client
        .list_executions(pipeline_id)
        .await
        .context("Failed to fetch pipeline executions for ID resolution")?;

    match_prefix("execution", &prefix, executions.iter().map(|e| e.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_parse_full_uuid() {
        let parsed = IdOrPrefix::parse("6f1c2a4e-0000-4000-8000-000000000001");
        assert!(matches!(parsed, IdOrPrefix::Full(_)));
    }

    #[test]
    fn test_parse_prefix_is_lowercased() {
        let parsed = IdOrPrefix::parse("6F1C");
        assert_eq!(parsed.to_string(), "6f1c");
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let a = id("6f1c2a4e-0000-4000-8000-000000000001");
        let b = id("9a0b2a4e-0000-4000-8000-000000000002");

        assert_eq!(match_prefix("agent", "6f", [a, b]).unwrap(), a);
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates() {
        let a = id("6f1c2a4e-0000-4000-8000-000000000001");
        let b = id("6f1d2a4e-0000-4000-8000-000000000002");

        let err = match_prefix("pipeline", "6f", [a, b]).unwrap_err().to_string();
        assert!(err.contains("Ambiguous"));
        assert!(err.contains(&a.to_string()));
        assert!(err.contains(&b.to_string()));
    }

    #[test]
    fn test_missing_prefix() {
        let a = id("6f1c2a4e-0000-4000-8000-000000000001");

        let err = match_prefix("schedule", "ff", [a]).unwrap_err().to_string();
        assert_eq!(err, "No schedule found with ID starting with 'ff'");
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let a = id("6f1c2a4e-0000-4000-8000-000000000001");
        assert!(match_prefix("plugin", "", [a]).is_err());
    }
}
