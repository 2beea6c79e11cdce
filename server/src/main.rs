use axum::{Router, response::IntoResponse, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voiceroulette_server::api::{AppState, api_routes};
use voiceroulette_server::config::Config;
use voiceroulette_server::gateway::{self, CacheRosterProvider, ConnectionState};
use voiceroulette_server::roster::RosterProvider;
use voiceroulette_server::roulette::MemoryHistory;
use voiceroulette_server::token::{SystemClock, TokenStore, spawn_sweeper};

/// Prometheus metrics handle for exposing metrics in Prometheus format
static PROMETHEUS_HANDLE: std::sync::OnceLock<PrometheusHandle> = std::sync::OnceLock::new();

/// Initialize the Prometheus metrics recorder
fn setup_prometheus_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Endpoint to expose metrics in Prometheus format
async fn prometheus_metrics() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus handle not initialized");
    handle.render()
}

/// Update gauge metrics (called periodically)
async fn update_gauge_metrics(state: &AppState) {
    metrics::gauge!("voiceroulette_tokens_live").set(state.token_store.token_count().await as f64);
    metrics::gauge!("voiceroulette_uptime_seconds").set(state.started_at.elapsed().as_secs() as f64);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize Prometheus metrics recorder (must be done before any metrics are recorded)
    let prometheus_handle = setup_prometheus_metrics();
    PROMETHEUS_HANDLE.set(prometheus_handle).ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voiceroulette=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: host={}, port={}",
        config.host, config.port
    );
    if let Some(ref base_url) = config.public_base_url {
        info!("Public base URL: {}", base_url);
    }
    if config.discord.bot_token.is_empty() {
        anyhow::bail!("DISCORD_BOT_TOKEN must be set");
    }

    let token_store = Arc::new(TokenStore::new(config.token.ttl));
    let history = Arc::new(MemoryHistory::new(config.history.max_records));
    let conn = Arc::new(ConnectionState::default());

    // Build the gateway client before serving: the roster provider reads
    // straight from its cache.
    let mut client = gateway::build_client(&config, token_store.clone(), conn.clone()).await?;
    let roster: Arc<dyn RosterProvider> =
        Arc::new(CacheRosterProvider::new(client.cache.clone(), conn.clone()));

    tokio::spawn(async move {
        if let Err(e) = client.start().await {
            error!("Gateway client error: {}", e);
        }
    });

    // Periodic cleanup for expired tokens
    let sweeper = spawn_sweeper(token_store.clone(), config.token.sweep_interval);

    let app_state = AppState {
        token_store,
        roster,
        history,
        clock: Arc::new(SystemClock),
        spin: config.spin.clone(),
        started_at: Instant::now(),
    };

    // Periodic update of gauge metrics (every 5 seconds)
    let metrics_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            update_gauge_metrics(&metrics_state).await;
        }
    });

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api_routes(app_state)
        .merge(Router::new().route("/metrics/prometheus", get(prometheus_metrics)))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Voiceroulette server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}
