//! SchemaFlow Analyser - database schema introspection service
//!
//! Connect to a PostgreSQL, CockroachDB or Redshift database with a
//! connection string, analyse its catalog into a schema snapshot, and keep
//! that snapshot current through cheap per-object content hashes.

use schemaflow_analyser::config::Settings;
use schemaflow_analyser::routes::create_router;
use schemaflow_analyser::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting SchemaFlow Analyser...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let state = Arc::new(AppState::new(&settings));

    // Optional startup connection; the API works without one
    if let Some(url) = settings.database.url.as_deref() {
        match state.connections.connect(url, Some("default".to_string()), None).await {
            Ok(conn) => info!(
                "✅ Connected to '{}' as {} ({})",
                conn.database, conn.dialect, conn.id
            ),
            Err(e) => warn!("⚠️  DATABASE_URL set but connection failed: {}", e),
        }
    }

    // Build the router
    let app = create_router(state.clone(), &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Connection Management ───");
    info!("   POST   /api/connections                        - Connect to a database");
    info!("   GET    /api/connections                        - List all connections");
    info!("   GET    /api/connections/{{id}}                   - Connection details");
    info!("   DELETE /api/connections/{{id}}                   - Disconnect");
    info!("");
    info!("   ─── Schema Analysis ───");
    info!("   POST   /api/connections/{{id}}/analysis          - Full analysis");
    info!("   GET    /api/connections/{{id}}/analysis          - Latest snapshot");
    info!("   GET    /api/connections/{{id}}/analysis/fast     - Object hashes only");
    info!("   POST   /api/connections/{{id}}/analysis/refresh  - Incremental refresh");
    info!("   POST   /api/connections/{{id}}/analysis/object   - Analyse one object");
    info!("   GET    /api/snapshots                          - Latest snapshot per connection");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.connections.disconnect_all().await;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,schemaflow_analyser=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
