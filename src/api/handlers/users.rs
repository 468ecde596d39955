//! User management handlers.
//!
//! Registration is the one open endpoint; everything else goes through
//! the bearer-token extractor and the access policy.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::ApiState;
use crate::auth::{hash_password, CurrentUser};
use crate::error::{Error, Result};
use crate::policy::{authorize, Action, Resource, Role};
use crate::store::User;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Defaults to member; role escalation happens through admin updates.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Register an account. Open to unauthenticated callers.
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<User>> {
    if request.username.trim().is_empty() {
        return Err(Error::Validation("username is required".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(Error::Validation("email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(Error::Validation("password is required".to_string()));
    }

    if state
        .store
        .get_user_by_username(&request.username)
        .await?
        .is_some()
    {
        return Err(Error::Conflict("username already taken".to_string()));
    }

    let hash = hash_password(&request.password)?;
    let user = state
        .store
        .insert_user(
            &request.username,
            &request.email,
            &hash,
            request.role.unwrap_or(Role::Member),
        )
        .await?;

    tracing::info!(username = %user.username, "user registered");
    Ok(Json(user))
}

/// List all users. Staff only.
pub async fn list_users(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<User>>> {
    if !authorize(Some(caller.role), Action::List, Resource::User, false) {
        return Err(Error::PermissionDenied);
    }
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

/// Current caller's profile.
pub async fn me(CurrentUser(caller): CurrentUser) -> Json<User> {
    Json(caller)
}

pub async fn get_user(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<User>> {
    if !authorize(Some(caller.role), Action::Retrieve, Resource::User, false) {
        return Err(Error::PermissionDenied);
    }
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

pub async fn update_user(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    if !authorize(Some(caller.role), Action::Update, Resource::User, caller.id == id) {
        return Err(Error::PermissionDenied);
    }

    let current = state
        .store
        .get_user(id)
        .await?
        .ok_or(Error::NotFound("user"))?;

    // Only admins reassign roles.
    let role = match request.role {
        Some(role) if role != current.role => {
            if caller.role != Role::Admin {
                return Err(Error::PermissionDenied);
            }
            role
        }
        _ => current.role,
    };

    let hash = match request.password.as_deref() {
        Some(password) if !password.is_empty() => Some(hash_password(password)?),
        _ => None,
    };

    let user = state
        .store
        .update_user(id, &request.email, hash.as_deref(), role)
        .await?
        .ok_or(Error::NotFound("user"))?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if !authorize(Some(caller.role), Action::Delete, Resource::User, false) {
        return Err(Error::PermissionDenied);
    }
    if !state.store.delete_user(id).await? {
        return Err(Error::NotFound("user"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
