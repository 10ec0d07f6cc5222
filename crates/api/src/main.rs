use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sleuth_core::payment::PaymentGateway;
use sleuth_core::store::GameStore;
use sleuth_payments::PortOneApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sleuth_api::config::ServerConfig;
use sleuth_api::router::build_app_router;
use sleuth_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sleuth_api=debug,sleuth_engine=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, env = %config.app_env, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = sleuth_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    sleuth_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    sleuth_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn GameStore> = Arc::new(sleuth_db::PgStore::new(pool));

    // --- Payment gateway ---
    let gateway: Option<Arc<dyn PaymentGateway>> = match &config.payment.api_secret {
        Some(secret) => {
            let api: Arc<dyn PaymentGateway> = Arc::new(PortOneApi::new(
                config.payment.api_url.clone(),
                secret.clone(),
            ));
            tracing::info!(api_url = %config.payment.api_url, "Payment gateway configured");
            Some(api)
        }
        None => {
            tracing::warn!("PAYMENT_API_SECRET not set, payment completion disabled");
            None
        }
    };

    // --- App state ---
    let state = AppState::new(store, config.clone(), gateway);

    // Spawn the account reconciler (migrates anonymous progress on sign-up).
    let reconciler_handle = tokio::spawn(
        Arc::clone(&state.reconciler).run(state.session_bus.subscribe()),
    );
    tracing::info!("Account reconciler started");

    let session_bus = Arc::clone(&state.session_bus);
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Last sender once the router is gone; closing it stops the reconciler.
    drop(session_bus);
    match tokio::time::timeout(Duration::from_secs(5), reconciler_handle).await {
        Ok(Ok(())) => tracing::info!("Account reconciler stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Account reconciler task failed"),
        Err(_) => tracing::warn!("Account reconciler did not stop within 5s"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
