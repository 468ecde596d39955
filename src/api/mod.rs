//! REST API for the circulation daemon.
//!
//! Provides HTTP endpoints for:
//! - User registration, login, and management
//! - Book and category CRUD with search/filter/ordering
//! - Borrow records: create, return, fines, due-notification sweep
//! - Health

pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::ledger::Ledger;
use crate::notify::Mailer;
use crate::store::Store;

/// Shared state for API handlers.
pub struct ApiState {
    /// The relational store.
    pub store: Store,

    /// The borrow/fine workflow core.
    pub ledger: Ledger,

    /// Outbound mail, for the per-record custom email endpoint.
    pub mailer: Arc<dyn Mailer>,

    /// Service configuration.
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, config: AppConfig) -> Self {
        let ledger = Ledger::new(store.clone(), mailer.clone(), &config);
        Self {
            store,
            ledger,
            mailer,
            config,
        }
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    // CORS configuration - allow requests from any origin for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status/health
        .route("/api/v1/status", get(handlers::status::health))
        // Auth
        .route("/api/v1/auth/login", post(handlers::auth::login))
        // Users
        .route(
            "/api/v1/users",
            get(handlers::users::list_users).post(handlers::users::register),
        )
        // Note: /me must come before /:id to avoid matching "me" as an ID
        .route("/api/v1/users/me", get(handlers::users::me))
        .route(
            "/api/v1/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // Catalog
        .route(
            "/api/v1/books",
            get(handlers::books::list_books).post(handlers::books::create_book),
        )
        .route(
            "/api/v1/books/:id",
            get(handlers::books::get_book)
                .put(handlers::books::update_book)
                .delete(handlers::books::delete_book),
        )
        .route(
            "/api/v1/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/api/v1/categories/:id",
            get(handlers::categories::get_category)
                .put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        // Borrow records
        .route(
            "/api/v1/borrow-records",
            get(handlers::borrows::list_records).post(handlers::borrows::create_record),
        )
        .route(
            "/api/v1/borrow-records/check_due_books",
            get(handlers::borrows::check_due_books),
        )
        .route(
            "/api/v1/borrow-records/unpaid_fines",
            get(handlers::borrows::unpaid_fines),
        )
        .route(
            "/api/v1/borrow-records/:id",
            get(handlers::borrows::get_record).delete(handlers::borrows::delete_record),
        )
        .route(
            "/api/v1/borrow-records/:id/return",
            post(handlers::borrows::return_book),
        )
        .route(
            "/api/v1/borrow-records/:id/mark_fine_paid",
            post(handlers::borrows::mark_fine_paid),
        )
        .route(
            "/api/v1/borrow-records/:id/send_email",
            post(handlers::borrows::send_email),
        )
        // Middleware
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(())
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        if !status.is_success() {
                            tracing::warn!(
                                status = %status,
                                latency_ms = latency.as_millis(),
                                "request failed"
                            );
                        }
                    },
                ),
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(state: Arc<ApiState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("circdesk API listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
