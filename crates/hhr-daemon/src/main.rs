//! hhr-daemon entry point.
//!
//! Thin on purpose: loads config, sets up tracing, picks a store, wires
//! middleware and serves. Handlers live in `routes.rs`, shared state in
//! `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use hhr_config::{
    load_layered_yaml, paths_from_env, report_unused_keys, split_paths, ConfigConsumer,
    DeskConfig, UnusedKeyPolicy, ENV_DAEMON_ADDR,
};
use hhr_daemon::{routes, state};
use hhr_db::{HandStore, MemoryHandStore, PgHandStore};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "hhr-daemon")]
#[command(about = "Hand-history ingestion, replay and live-update service", long_about = None)]
struct Args {
    /// Comma-separated YAML layers (falls back to HHR_CONFIG).
    #[arg(long)]
    config: Option<String>,

    /// Keep hands in process memory instead of Postgres.
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let args = Args::parse();
    let config = load_desk_config(args.config.as_deref())?
        .with_addr_override(std::env::var(ENV_DAEMON_ADDR).ok());

    let store = open_store(&config, args.memory).await?;
    let shared = Arc::new(state::AppState::new(store, config.clone()));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from_config(&config.server.cors_origins));

    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server.addr: {}", config.server.addr))?;
    info!("hhr-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("hhr-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// No layers at all means built-in defaults.
fn load_desk_config(flag: Option<&str>) -> anyhow::Result<DeskConfig> {
    let paths: Vec<String> = match flag {
        Some(v) => split_paths(v),
        None => paths_from_env(),
    };
    if paths.is_empty() {
        info!("no config layers given; using defaults");
        return Ok(DeskConfig::default());
    }

    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&refs)?;
    info!(config_hash = %loaded.config_hash, layers = ?paths, "config loaded");

    let report = report_unused_keys(
        ConfigConsumer::Daemon,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has keys the daemon never reads");
    }

    DeskConfig::from_loaded(&loaded)
}

async fn open_store(config: &DeskConfig, memory: bool) -> anyhow::Result<Arc<dyn HandStore>> {
    if memory {
        warn!("running with the in-memory store; hands are lost on exit");
        return Ok(Arc::new(MemoryHandStore::new()));
    }

    let db = &config.database;
    let pool = hhr_db::connect_from_env_var(&db.url_env, db.max_connections).await?;
    if db.run_migrations {
        hhr_db::migrate(&pool).await?;
        info!("migrations applied");
    }
    Ok(Arc::new(PgHandStore::new(pool)))
}

fn cors_from_config(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown requested");
}
