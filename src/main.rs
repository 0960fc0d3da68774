use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use service_monitor::config::{Config, StoreKind};
use service_monitor::metrics::MetricsRecorder;
use service_monitor::probe::ModelApiProbe;
use service_monitor::store::{MemoryStore, MetricsStore, RedisStore};
use service_monitor::{server, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("service_monitor=info,tower_http=info")),
        )
        .with(fmt::layer())
        .init();

    let config = Config::parse();

    // ── 1. Open the store ────────────────────────────────────────
    let store: Arc<dyn MetricsStore> = match config.store {
        StoreKind::Redis => {
            tracing::info!(url = %config.redis_url, prefix = %config.key_prefix, "connecting to redis");
            let store = RedisStore::connect(&config.redis_url, config.key_prefix.clone())
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "cannot connect to redis");
                    e
                })?;
            Arc::new(store)
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store, metrics are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    // ── 2. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState {
        store: store.clone(),
        recorder: Arc::new(MetricsRecorder::new(store)),
        model_probe: ModelApiProbe::new(
            config.ai_api_base.clone(),
            config.ai_api_key.clone(),
            config.ai_probe_timeout(),
        ),
        stream_interval: config.stream_interval(),
    });

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %config.bind, "service monitor listening");

    axum::serve(listener, app).await?;
    Ok(())
}
