//! PeerLend Backend Server
//!
//! Rust backend for the PeerLend peer-to-peer lending tracker: loan
//! lifecycle authorization against an external ledger, unsigned transaction
//! assembly for external signing, and due-date reminder notifications.

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use peerlend_server::config::Config;
use peerlend_server::db;
use peerlend_server::identity::IdentityResolver;
use peerlend_server::ledger::{JsonRpcLedger, LoanLedger, TxBuilder};
use peerlend_server::middleware::JwtVerifier;
use peerlend_server::notifications::{
    DbReminderDirectory, HttpPushSender, NotificationService, ReminderScheduler,
};
use peerlend_server::routes;
use peerlend_server::state::AppState;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    // Initialize database connection pool and schema
    let db_pool = match db::create_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&db_pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    // Ledger client and transaction builder
    let ledger: Arc<dyn LoanLedger> = Arc::new(JsonRpcLedger::new(
        config.ledger_rpc_url.clone(),
        config.contract_address.clone(),
        config.ledger_timeout,
    ));

    let tx_builder = Arc::new(TxBuilder::new(
        ledger.clone(),
        config.contract_address.clone(),
        config.gas_limit,
    ));

    // Local services
    let identity = Arc::new(IdentityResolver::new(db_pool.clone()));
    let notifications = Arc::new(NotificationService::new(db_pool.clone()));
    let jwt_verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));

    // Start the reminder scheduler; the first scan runs immediately but on
    // its own task, never blocking the startup path.
    let scheduler = ReminderScheduler::new(
        ledger.clone(),
        Arc::new(DbReminderDirectory::new(
            IdentityResolver::new(db_pool.clone()),
            NotificationService::new(db_pool.clone()),
        )),
        Arc::new(HttpPushSender::new(
            config.push_gateway_url.clone(),
            config.push_server_key.clone(),
        )),
        config.reminder_interval,
        config.urgency_window,
    );
    let scheduler_handle = scheduler.start();

    // Create shared app state
    let app_state = AppState::new(ledger, tx_builder, identity, notifications, jwt_verifier);

    // Clone db_pool for health check
    let health_db_pool = db_pool.clone();

    // Create the app router
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_db_pool.clone())))
        .merge(routes::loan_routes())
        .merge(routes::notification_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Serve with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    // Stop the scheduler exactly once; an in-flight scan is allowed to
    // finish, no new scan starts.
    scheduler_handle.stop().await;

    tracing::info!("Server shutdown complete");
}

async fn root() -> &'static str {
    "PeerLend API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::PgPool) -> axum::Json<HealthResponse> {
    let db_status = match db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
