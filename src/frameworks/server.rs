// Framework bootstrap for the match server runtime.

use crate::domain::ZoneTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{create_match_handler, spawn_match_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{MatchRegistry, MatchSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{
    collections::{HashMap, HashSet},
    io::Result,
    sync::Arc,
};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/matches", post(create_match_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    // The registry owns every active match task and its channel wiring.
    let match_registry = Arc::new(MatchRegistry::new(MatchSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        update_broadcast_capacity: config::UPDATE_BROADCAST_CAPACITY,
        tick_interval: config::TICK_INTERVAL,
        tuning: ZoneTuning::default(),
        end_linger: config::MATCH_END_LINGER,
    }));

    // Create the default open match and spawn its zone loop. Anyone may join
    // it and pick a team, which keeps local clients and tests simple. Pinned,
    // so the registry never deletes it.
    let main_match_id = "main".to_string();
    let main_match = match_registry
        .create_match(main_match_id.clone(), HashSet::new(), HashMap::new(), true)
        .await
        .expect("default match should initialize");
    spawn_match_serializer(&main_match);
    match_registry.clone().spawn_match_end_watcher(
        main_match.match_id.clone(),
        main_match.server_state_tx.subscribe(),
    );

    Ok(Arc::new(AppState {
        match_registry,
        default_match_id: Arc::from(main_match_id.as_str()),
    }))
}
