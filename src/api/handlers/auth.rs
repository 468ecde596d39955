//! Login handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::auth;
use crate::error::Result;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Exchange credentials for a bearer token.
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let token = auth::login(
        &state.store,
        &request.username,
        &request.password,
        state.config.token_ttl_hours,
    )
    .await?;

    Ok(Json(LoginResponse { token }))
}
