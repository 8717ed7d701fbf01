//! Editorial API Gateway
//!
//! HTTP surface over the editorial workflow engine.
//! Handles:
//! - Submission intake (direct and form webhook)
//! - Status transitions and assignment sweeps
//! - Editor and team management behind the admin key
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use editorial_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{create_store, DocumentStore},
    metrics,
    notify::create_notifier,
    Editorial,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub editorial: Arc<Editorial>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Editorial API Gateway v{}",
        editorial_common::VERSION
    );

    init_metrics(&config.observability)?;

    let store = create_store(&config.store).context("Failed to initialize document store")?;
    let notifier = create_notifier(&config.notifier).context("Failed to initialize notifier")?;
    if let Err(e) = store.ping().await {
        // Reads fail until the store comes back; /ready reports it
        error!(error = %e, backend = store.backend_name(), "Document store not reachable at startup");
    }

    let config = Arc::new(config);
    let state = AppState {
        editorial: Arc::new(Editorial::new(store, notifier, &config)),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    metrics::register_metrics();

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Board management requires the admin key
    let admin_routes = Router::new()
        .route(
            "/editors",
            get(handlers::editors::list_editors).post(handlers::editors::create_editor),
        )
        .route(
            "/editors/{id}",
            put(handlers::editors::update_editor).delete(handlers::editors::deactivate_editor),
        )
        .route("/teams", post(handlers::teams::create_team))
        .route(
            "/teams/{id}",
            put(handlers::teams::update_team).delete(handlers::teams::deactivate_team),
        )
        .route("/audit-log", get(handlers::audit::audit_log))
        .route(
            "/submissions/assign-pending",
            post(handlers::submissions::assign_pending),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::admin_key::require_admin_key,
        ));

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Submissions
        .route(
            "/submissions",
            get(handlers::submissions::list_submissions)
                .post(handlers::submissions::create_submission),
        )
        .route(
            "/submissions/status",
            post(handlers::submissions::update_status).put(handlers::submissions::update_status),
        )
        .route("/submissions/{id}", get(handlers::submissions::get_submission))
        // Editors and teams
        .route("/editors/auth", post(handlers::editors::authenticate))
        .route("/teams", get(handlers::teams::list_teams))
        // Intake webhooks
        .route("/webhooks/google-form", post(handlers::webhooks::google_form))
        .merge(admin_routes)
        .route_layer(from_fn(middleware::request_metrics::track_requests));

    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(layers)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
