mod error;
mod routes;
mod state;
#[cfg(test)]
mod tests;

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use grid_control::{load_config, Pipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::routes::make_router_with_cors;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "grid_daemon", about = "District pollutant pipeline HTTP daemon")]
struct Cli {
    /// Pipeline config (JSON). Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `state_file` from the config.
    #[arg(long)]
    state_file: Option<PathBuf>,
    /// Overrides `seed` from the config.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 5000)]
    port: u16,
    /// Allowed CORS origin, or `*` for any.
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn parse_origin(origin: &str) -> Result<Option<HeaderValue>> {
    if origin == "*" {
        return Ok(None);
    }
    let value = origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid --cors-origin {origin:?}"))?;
    Ok(Some(value))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    let cors_origin = parse_origin(&cli.cors_origin)?;

    tracing::info!(
        state_file = %config.state_file.display(),
        default_year = %config.default_year,
        "starting grid_daemon"
    );
    let app_state = AppState::new(Pipeline::from_config(&config));
    let router = make_router_with_cors(app_state, cors_origin);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
