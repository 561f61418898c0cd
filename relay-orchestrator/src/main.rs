use std::sync::Arc;

use anyhow::Context;
use relay_engine::agent::{AgentRunner, EchoAgentRunner, HttpAgentRunner};
use relay_engine::store::MemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod state;

use config::Config;
use repository::PgStore;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_orchestrator=debug,relay_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Relay Orchestrator...");

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;

    let runner: Arc<dyn AgentRunner> = match &config.agent_runner_url {
        Some(url) => {
            tracing::info!("Using agent runner at {}", url);
            Arc::new(
                HttpAgentRunner::new(url.clone(), config.agent_runner_timeout)
                    .context("Failed to create agent runner")?,
            )
        }
        None => {
            tracing::warn!("AGENT_RUNNER_URL not set; agents will echo their prompts");
            Arc::new(EchoAgentRunner)
        }
    };

    let (state, _worker) = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(database_url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            AppState::build(Arc::new(PgStore::new(pool)), runner, config.engine.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            AppState::build(Arc::new(MemoryStore::new()), runner, config.engine.clone())
        }
    };

    if config.dispatch_interval.is_zero() {
        tracing::info!("In-process dispatcher disabled; use POST /scheduler/dispatch");
    } else {
        tokio::spawn(state.dispatcher.clone().run_periodic(config.dispatch_interval));
    }

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
