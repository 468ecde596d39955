//! Status and health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::api::ApiState;
use crate::error::Result;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,

    /// Books in the catalog.
    pub books: usize,

    /// Open borrow records (books currently out).
    pub open_records: usize,

    /// Open records already due or overdue.
    pub due_or_overdue: usize,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<ApiState>>) -> Result<Json<HealthResponse>> {
    let books = state.store.list_books(&Default::default()).await?.len();
    let open_records = state
        .store
        .list_borrow_records()
        .await?
        .iter()
        .filter(|r| r.is_open())
        .count();
    let due_or_overdue = state.store.list_due_or_overdue(Utc::now()).await?.len();

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        books,
        open_records,
        due_or_overdue,
    }))
}
