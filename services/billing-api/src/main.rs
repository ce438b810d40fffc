//! Hamper Billing API
//!
//! Subscription billing microservice: enrollment with conflict resolution,
//! wallet top-ups, and the periodic billing sweep.
//!
//! ## REST Endpoints
//!
//! - `POST /api/v1/subscriptions` - Enroll a bundle (201, or 409 on conflict)
//! - `GET /api/v1/subscriptions` - List a user's subscriptions
//! - `GET /api/v1/subscriptions/{id}` - One subscription with billing history
//! - `DELETE /api/v1/subscriptions/{id}` - Cancel
//! - `POST /api/v1/subscriptions/{id}/pause` - Pause
//! - `POST /api/v1/subscriptions/{id}/resume` - Resume
//! - `GET /api/v1/wallet` - Balance and recent ledger entries
//! - `POST /api/v1/wallet/topup` - Credit the wallet
//! - `POST /internal/billing/sweep` - Run the sweep now, optionally as of a date
//!
//! ## Background
//!
//! A ticker runs the billing sweep on a fixed interval (daily by default);
//! the manual trigger covers backfill and testing.
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use hamper_billing_core::BillingService;
use hamper_db::Repositories;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("billing_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hamper Billing API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        sweep_enabled = config.sweep_enabled,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool = hamper_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Create repositories
    let repos = Repositories::new(pool.clone());

    // Create billing service
    let billing = BillingService::new((&repos).into(), config.billing.clone());

    // Create application state
    let state = AppState::new(billing, pool, config.clone());

    // Start the periodic sweep ticker
    if config.sweep_enabled {
        spawn_sweep_ticker(state.clone());
    }

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    // Start server
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    run_http_server(app, http_addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // API v1 routes
    let api_v1 = Router::new()
        // Subscription routes
        .route(
            "/subscriptions",
            post(handlers::enroll).get(handlers::list_subscriptions),
        )
        .route(
            "/subscriptions/{id}",
            get(handlers::get_subscription).delete(handlers::cancel_subscription),
        )
        .route(
            "/subscriptions/{id}/pause",
            post(handlers::pause_subscription),
        )
        .route(
            "/subscriptions/{id}/resume",
            post(handlers::resume_subscription),
        )
        // Wallet routes
        .route("/wallet", get(handlers::get_wallet))
        .route("/wallet/topup", post(handlers::top_up_wallet));

    // Ops routes (manual sweep trigger)
    let internal_routes = Router::new().route("/internal/billing/sweep", post(handlers::trigger_sweep));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    // Combine all routes
    Router::new()
        .nest("/api/v1", api_v1)
        .merge(internal_routes)
        .layer(middleware)
        .merge(health_routes) // Health routes without timeout
        .merge(metrics_route) // Metrics route without timeout
        .with_state(state)
}

/// Run the billing sweep on a fixed interval until shutdown
fn spawn_sweep_ticker(state: AppState) {
    let interval = state.config.sweep_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let as_of = chrono::Utc::now().date_naive();
            match state.billing.run_sweep(as_of).await {
                Ok(report) => {
                    tracing::info!(
                        %as_of,
                        due = report.due,
                        billed = report.billed,
                        insufficient_funds = report.insufficient_funds,
                        "Scheduled sweep tick finished"
                    );
                }
                Err(e) => {
                    tracing::error!(%as_of, error = %e, "Scheduled sweep tick failed");
                }
            }
        }
    });
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Latency buckets optimized for billing operations
    // Most ops should complete in <100ms, SLO at <200ms p99
    let billing_latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            billing_latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("billing_operation_duration_seconds".to_string()),
            billing_latency_buckets,
        )?;

    let handle = builder.install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "billing_enrollments_total",
        "Total enrollment requests by result"
    );
    metrics::describe_counter!(
        "billing_subscriptions_cancelled_total",
        "Total subscriptions cancelled"
    );
    metrics::describe_counter!(
        "billing_wallet_topups_total",
        "Total wallet top-ups"
    );
    metrics::describe_counter!(
        "billing_cycles_total",
        "Total billing cycles processed by outcome"
    );
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    metrics::describe_histogram!(
        "billing_operation_duration_seconds",
        "Billing operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
