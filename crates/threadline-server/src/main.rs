//! HTTP server entry point.
//!
//! Loads configuration, builds the agent client once, and serves the router
//! until Ctrl-C. Any initialization failure exits before the port is bound.

mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use threadline_agent::AgentClient;
use threadline_config::Config;
use threadline_server::{router, validate_api_settings, ServerState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_handle = telemetry::init();

    let config = Config::load_from_env().context("failed to load configuration")?;
    telemetry::apply_config_level(&log_handle, &config.logging.level);
    info!(
        "{} v{} (debug: {})",
        config.app.name, config.app.version, config.app.debug
    );

    let state = Arc::new(init_server_state(&config)?);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

/// Resolves the model, builds the agent client, and checks the routes.
fn init_server_state(config: &Config) -> Result<ServerState> {
    validate_api_settings(&config.api)?;

    let model = config
        .resolve_model(|key| std::env::var(key).ok())
        .context("failed to resolve model configuration")?;
    info!("Model: {} via {}", model.model, model.provider);

    let agent = AgentClient::from_config(config, &model).context("failed to initialize agent client")?;
    info!("Agent timeout: {}s", agent.timeout().as_secs());

    Ok(ServerState::new(agent, config.api.clone()))
}
