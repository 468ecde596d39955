//! Catalog handlers for categories.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::api::ApiState;
use crate::auth::CurrentUser;
use crate::error::{Error, Result};
use crate::policy::{authorize, Action, Resource};
use crate::store::categories::CategoryInput;
use crate::store::Category;

pub async fn list_categories(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Category>>> {
    if !authorize(Some(caller.role), Action::List, Resource::Category, false) {
        return Err(Error::PermissionDenied);
    }
    let categories = state.store.list_categories().await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Category>> {
    if !authorize(Some(caller.role), Action::Retrieve, Resource::Category, false) {
        return Err(Error::PermissionDenied);
    }
    let category = state
        .store
        .get_category(id)
        .await?
        .ok_or(Error::NotFound("category"))?;
    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    if !authorize(Some(caller.role), Action::Create, Resource::Category, false) {
        return Err(Error::PermissionDenied);
    }
    if input.name.trim().is_empty() {
        return Err(Error::Validation("name is required".to_string()));
    }
    let category = state.store.insert_category(&input.name).await?;
    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    if !authorize(Some(caller.role), Action::Update, Resource::Category, false) {
        return Err(Error::PermissionDenied);
    }
    if input.name.trim().is_empty() {
        return Err(Error::Validation("name is required".to_string()));
    }
    let category = state
        .store
        .update_category(id, &input.name)
        .await?
        .ok_or(Error::NotFound("category"))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if !authorize(Some(caller.role), Action::Delete, Resource::Category, false) {
        return Err(Error::PermissionDenied);
    }
    if !state.store.delete_category(id).await? {
        return Err(Error::NotFound("category"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
