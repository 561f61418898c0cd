//! Orchestrator configuration

use std::time::Duration;

use relay_engine::EngineConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// PostgreSQL connection string; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Agent runner endpoint; the echo runner is used when absent
    pub agent_runner_url: Option<String>,

    /// Per-call timeout for the agent runner
    pub agent_runner_timeout: Duration,

    /// In-process dispatcher tick; zero disables it
    pub dispatch_interval: Duration,

    pub engine: EngineConfig,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ORCHESTRATOR_BIND_ADDR (default: 0.0.0.0:8080)
    /// - DATABASE_URL (optional)
    /// - AGENT_RUNNER_URL (optional)
    /// - AGENT_RUNNER_TIMEOUT_SECS (default: 60)
    /// - DISPATCH_INTERVAL_SECS (default: 60, 0 disables)
    ///
    /// Engine settings are read by [`EngineConfig::from_env`].
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("ORCHESTRATOR_BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: non_empty_var("DATABASE_URL"),
            agent_runner_url: non_empty_var("AGENT_RUNNER_URL"),
            agent_runner_timeout: secs_var("AGENT_RUNNER_TIMEOUT_SECS")
                .unwrap_or(defaults.agent_runner_timeout),
            dispatch_interval: secs_var("DISPATCH_INTERVAL_SECS")
                .unwrap_or(defaults.dispatch_interval),
            engine: EngineConfig::from_env(),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.agent_runner_timeout.is_zero() {
            anyhow::bail!("agent_runner_timeout must be greater than 0");
        }

        if let Some(url) = &self.agent_runner_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("agent_runner_url must be an http(s) URL, got '{}'", url);
            }
        }

        self.engine.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            agent_runner_url: None,
            agent_runner_timeout: Duration::from_secs(60),
            dispatch_interval: Duration::from_secs(60),
            engine: EngineConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn secs_var(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
