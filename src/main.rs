use std::sync::Arc;

use eisen_server::{board, router, AppState, Settings, SharedState, Store};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

#[cfg(feature = "profile-console")]
fn init_tracing(_settings: &Settings) {
    console_subscriber::init();
}

#[cfg(not(feature = "profile-console"))]
fn init_tracing(settings: &Settings) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    init_tracing(&settings);

    // ── Open the store ─────────────────────────────────────────
    let store = Store::open(&settings.database_path)?;
    let totals = store.read(|r| board::aggregate_stats(r))?;
    info!(
        path = %settings.database_path,
        total = totals.total,
        done = totals.done,
        "store opened"
    );

    let addr = settings.bind_address();
    let static_dir = settings.static_dir.clone();
    let state: SharedState = Arc::new(AppState { store, settings });

    // ── Router ─────────────────────────────────────────────────
    let app = router(state)
        .fallback_service(ServeDir::new(&static_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // ── Start ──────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, %static_dir, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
