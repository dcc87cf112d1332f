mod api;
mod auction;
mod config;
mod db;
mod error;
mod registry;
mod types;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::{players, rounds, teams, Ledger};
use crate::error::{AppError, Result};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let ledger = Ledger::connect(&cfg).await?;
    info!("Database ready at {}", cfg.db_path);
    log_snapshot(&ledger).await?;

    // --- HTTP API server ---
    let app = router(ApiState::new(ledger, &cfg))
        .layer(cors_layer(&cfg.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// One line describing the ledger the server is about to serve.
async fn log_snapshot(ledger: &Ledger) -> Result<()> {
    let pool = ledger.pool();
    let team_count = teams::list(pool).await?.len();
    let available = players::available(pool).await?.len();
    let version = ledger.version().await?;
    match rounds::live(pool).await? {
        Some(round) => warn!(
            round_id = round.id,
            player_id = round.player_id,
            current_bid = %round.current_bid,
            "Resuming with a live round open",
        ),
        None => info!("No live round"),
    }
    info!(
        teams = team_count,
        available_players = available,
        ledger_version = version,
        "LEDGER | teams: {} | players available: {} | version: {}",
        team_count, available, version,
    );
    Ok(())
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }
    let parsed = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| AppError::Config(format!("CORS_ORIGINS contains an invalid origin {o:?}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any))
}
