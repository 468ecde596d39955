//! Catalog handlers for books.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::api::ApiState;
use crate::auth::CurrentUser;
use crate::error::{Error, Result};
use crate::policy::{authorize, Action, Resource};
use crate::store::{Book, BookFilter, BookInput};

/// List books with search, filters, and ordering.
pub async fn list_books(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Query(filter): Query<BookFilter>,
) -> Result<Json<Vec<Book>>> {
    if !authorize(Some(caller.role), Action::List, Resource::Book, false) {
        return Err(Error::PermissionDenied);
    }
    let books = state.store.list_books(&filter).await?;
    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Book>> {
    if !authorize(Some(caller.role), Action::Retrieve, Resource::Book, false) {
        return Err(Error::PermissionDenied);
    }
    let book = state
        .store
        .get_book(id)
        .await?
        .ok_or(Error::NotFound("book"))?;
    Ok(Json(book))
}

fn validate(input: &BookInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(Error::Validation("title is required".to_string()));
    }
    if input.author.trim().is_empty() {
        return Err(Error::Validation("author is required".to_string()));
    }
    if input.isbn.trim().is_empty() {
        return Err(Error::Validation("isbn is required".to_string()));
    }
    Ok(())
}

pub async fn create_book(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>> {
    if !authorize(Some(caller.role), Action::Create, Resource::Book, false) {
        return Err(Error::PermissionDenied);
    }
    validate(&input)?;

    if state
        .store
        .get_category(input.category_id)
        .await?
        .is_none()
    {
        return Err(Error::Validation("unknown category".to_string()));
    }
    if state.store.get_book_by_isbn(&input.isbn).await?.is_some() {
        return Err(Error::Conflict(
            "a book with this ISBN already exists".to_string(),
        ));
    }

    let book = state.store.insert_book(&input).await?;
    Ok(Json(book))
}

pub async fn update_book(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>> {
    if !authorize(Some(caller.role), Action::Update, Resource::Book, false) {
        return Err(Error::PermissionDenied);
    }
    validate(&input)?;

    if state
        .store
        .get_category(input.category_id)
        .await?
        .is_none()
    {
        return Err(Error::Validation("unknown category".to_string()));
    }

    // ISBN stays unique across the catalog.
    if let Some(existing) = state.store.get_book_by_isbn(&input.isbn).await? {
        if existing.id != id {
            return Err(Error::Conflict(
                "a book with this ISBN already exists".to_string(),
            ));
        }
    }

    let book = state
        .store
        .update_book(id, &input)
        .await?
        .ok_or(Error::NotFound("book"))?;
    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if !authorize(Some(caller.role), Action::Delete, Resource::Book, false) {
        return Err(Error::PermissionDenied);
    }
    if !state.store.delete_book(id).await? {
        return Err(Error::NotFound("book"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
