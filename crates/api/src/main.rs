//! API server entry point.

use api::TokenIssuer;
use api::config::Config;
use domain::ImageResolver;
use store::{Database, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load .env (if any) and configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Connect to PostgreSQL and apply migrations
    let db = Database::connect(&config.database_config())
        .await
        .expect("failed to connect to database");
    db.run_migrations().await.expect("failed to run migrations");
    let store = PostgresStore::new(db.clone());

    // 5. Build application state
    let secret = config
        .jwt_secret
        .as_deref()
        .expect("JWT_SECRET must be set");
    let tokens = TokenIssuer::new(secret.as_bytes(), config.jwt_ttl);
    let images = ImageResolver::new(config.image_dir(), "/assets/images");
    let state = api::create_default_state(store, tokens, images);

    // 6. Build the application
    let app = api::create_app(state, metrics_handle, Some(config.static_dir.clone()));

    // 7. Start server
    let addr = config.addr();
    tracing::info!(%addr, ?config, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    db.close().await;
    tracing::info!("server shut down gracefully");
}
