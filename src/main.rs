//! Commission & Wallet Service - Main Application Entry Point
//!
//! This is a REST API server for managing sales-agent commissions and agent
//! wallets. Commissions move through a lifecycle (pending, approved, paid,
//! rejected, cancelled); every lifecycle step that affects earned money is
//! mirrored atomically into the agent's wallet balance and an append-only
//! transaction ledger. Agents can lock wallet funds in withdrawal requests
//! that admins approve, reject, or pay.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: Bearer token with SHA-256 hashing, role-based
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the notification dispatcher
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::services::notification_service::Notifier;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    config.validate_notification_url()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Build the notification dispatcher from config (may be a no-op sink
    // when no endpoint is configured)
    let notifier = Notifier::from_config(&config)?;

    let state = AppState {
        pool,
        notifier,
    };

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Commission lifecycle routes
        .route(
            "/api/v1/commissions",
            post(handlers::commissions::create_commission),
        )
        .route(
            "/api/v1/commissions",
            get(handlers::commissions::list_commissions),
        )
        .route(
            "/api/v1/commissions/{id}",
            get(handlers::commissions::get_commission),
        )
        .route(
            "/api/v1/commissions/{id}",
            patch(handlers::commissions::update_commission),
        )
        .route(
            "/api/v1/commissions/{id}/amount",
            patch(handlers::commissions::update_amount),
        )
        .route(
            "/api/v1/commissions/{id}/payout",
            post(handlers::commissions::payout_commission),
        )
        // Withdrawal flow routes
        .route(
            "/api/v1/withdrawal-requests",
            post(handlers::withdrawals::create_withdrawal),
        )
        .route(
            "/api/v1/withdrawal-requests",
            get(handlers::withdrawals::list_withdrawals),
        )
        .route(
            "/api/v1/withdrawal-requests/{id}",
            get(handlers::withdrawals::get_withdrawal),
        )
        .route(
            "/api/v1/withdrawal-requests/{id}/approve",
            patch(handlers::withdrawals::approve_withdrawal),
        )
        .route(
            "/api/v1/withdrawal-requests/{id}/reject",
            patch(handlers::withdrawals::reject_withdrawal),
        )
        .route(
            "/api/v1/withdrawal-requests/{id}/pay",
            patch(handlers::withdrawals::pay_withdrawal),
        )
        // Wallet routes
        .route("/api/v1/wallet", get(handlers::wallet::get_wallet))
        .route(
            "/api/v1/wallet/transactions",
            get(handlers::wallet::list_transactions),
        )
        // Lead lifecycle hook
        .route(
            "/api/v1/leads/events",
            post(handlers::leads::handle_lead_event),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share application state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
