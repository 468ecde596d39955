//! Borrow record handlers: the circulation workflow surface.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ApiState;
use crate::auth::CurrentUser;
use crate::error::{Error, Result};
use crate::policy::{authorize, Action, Resource, Role};
use crate::store::{BorrowRecord, User};

/// Borrower details, exposed to staff only.
#[derive(Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// A borrow record as the API returns it.
#[derive(Serialize)]
pub struct BorrowResponse {
    #[serde(flatten)]
    pub record: BorrowRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

impl BorrowResponse {
    fn new(record: BorrowRecord, caller_role: Role, borrower: Option<&User>) -> Self {
        let user_info = if caller_role.is_staff() {
            borrower.map(|u| UserInfo {
                id: u.id,
                username: u.username.clone(),
                email: u.email.clone(),
            })
        } else {
            None
        };
        Self { record, user_info }
    }
}

async fn with_borrower(
    state: &ApiState,
    record: BorrowRecord,
    caller_role: Role,
) -> Result<BorrowResponse> {
    let borrower = if caller_role.is_staff() {
        state.store.get_user(record.user_id).await?
    } else {
        None
    };
    Ok(BorrowResponse::new(record, caller_role, borrower.as_ref()))
}

/// List borrow records. Staff see all; members see their own.
pub async fn list_records(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<BorrowResponse>>> {
    if !authorize(Some(caller.role), Action::List, Resource::BorrowRecord, true) {
        return Err(Error::PermissionDenied);
    }

    let records = if caller.role.is_staff() {
        state.store.list_borrow_records().await?
    } else {
        state.store.list_borrow_records_for_user(caller.id).await?
    };

    let mut responses = Vec::with_capacity(records.len());
    for record in records {
        responses.push(with_borrower(&state, record, caller.role).await?);
    }
    Ok(Json(responses))
}

#[derive(Deserialize)]
pub struct CreateBorrowRequest {
    pub book_id: i64,
    /// Defaults to the configured loan period from now.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Borrow a book. The record always belongs to the caller.
pub async fn create_record(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Json(request): Json<CreateBorrowRequest>,
) -> Result<Json<BorrowResponse>> {
    if !authorize(Some(caller.role), Action::Create, Resource::BorrowRecord, true) {
        return Err(Error::PermissionDenied);
    }

    let record = state
        .ledger
        .create_borrow(caller.id, request.book_id, request.due_date)
        .await?;
    with_borrower(&state, record, caller.role).await.map(Json)
}

async fn load_gated(
    state: &ApiState,
    caller: &User,
    id: i64,
    action: Action,
) -> Result<BorrowRecord> {
    let record = state
        .store
        .get_borrow_record(id)
        .await?
        .ok_or(Error::NotFound("borrow record"))?;

    // A record the caller may not see answers exactly like an unknown id,
    // so members cannot probe which record ids exist.
    let owner = record.user_id == caller.id;
    if !authorize(Some(caller.role), action, Resource::BorrowRecord, owner) {
        return Err(Error::NotFound("borrow record"));
    }
    Ok(record)
}

pub async fn get_record(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<BorrowResponse>> {
    let record = load_gated(&state, &caller, id, Action::Retrieve).await?;
    with_borrower(&state, record, caller.role).await.map(Json)
}

pub async fn delete_record(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let record = load_gated(&state, &caller, id, Action::Delete).await?;
    state.store.delete_borrow_record(record.id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Return a borrowed book.
pub async fn return_book(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    load_gated(&state, &caller, id, Action::Return).await?;

    let outcome = state.ledger.return_borrow(id).await?;
    Ok(Json(json!({
        "message": outcome.message,
        "record": outcome.record,
    })))
}

/// Trigger the due-notification sweep. Admin only.
pub async fn check_due_books(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<serde_json::Value>> {
    if !authorize(Some(caller.role), Action::Sweep, Resource::BorrowRecord, false) {
        return Err(Error::PermissionDenied);
    }

    let count = state.ledger.sweep(Utc::now()).await?;
    Ok(Json(json!({
        "message": format!("Sent {count} notifications for overdue books"),
    })))
}

/// List records with outstanding fines. Admin only.
pub async fn unpaid_fines(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<BorrowResponse>>> {
    if !authorize(
        Some(caller.role),
        Action::ListUnpaidFines,
        Resource::BorrowRecord,
        false,
    ) {
        return Err(Error::PermissionDenied);
    }

    let records = state.ledger.list_unpaid_fines().await?;
    let mut responses = Vec::with_capacity(records.len());
    for record in records {
        responses.push(with_borrower(&state, record, caller.role).await?);
    }
    Ok(Json(responses))
}

/// Settle a fine. Admin only.
pub async fn mark_fine_paid(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if !authorize(
        Some(caller.role),
        Action::MarkFinePaid,
        Resource::BorrowRecord,
        false,
    ) {
        return Err(Error::PermissionDenied);
    }

    let (record, message) = state.ledger.mark_fine_paid(id).await?;
    Ok(Json(json!({ "message": message, "record": record })))
}

#[derive(Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Both fields must be present with non-whitespace content.
fn custom_email_fields(request: &SendEmailRequest) -> Result<(&str, &str)> {
    let subject = request
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match (subject, message) {
        (Some(subject), Some(message)) => Ok((subject, message)),
        _ => Err(Error::Validation(
            "subject and message are required".to_string(),
        )),
    }
}

/// Send a custom email to the borrower of a record. Staff only.
pub async fn send_email(
    State(state): State<Arc<ApiState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<serde_json::Value>> {
    if !authorize(Some(caller.role), Action::SendEmail, Resource::BorrowRecord, false) {
        return Err(Error::PermissionDenied);
    }

    let (subject, message) = custom_email_fields(&request)?;

    let record = state
        .store
        .get_borrow_record(id)
        .await?
        .ok_or(Error::NotFound("borrow record"))?;
    let borrower = state
        .store
        .get_user(record.user_id)
        .await?
        .ok_or(Error::NotFound("user"))?;

    state.mailer.send(&borrower.email, subject, message).await?;
    Ok(Json(json!({ "message": "Email sent successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiState;
    use crate::config::AppConfig;
    use crate::notify::testing::RecordingMailer;
    use crate::store::{test_store, BookInput};

    async fn test_state() -> ApiState {
        let store = test_store().await;
        let mailer = Arc::new(RecordingMailer::default());
        ApiState::new(store, mailer, AppConfig::new("sqlite::memory:"))
    }

    fn email_request(subject: Option<&str>, message: Option<&str>) -> SendEmailRequest {
        SendEmailRequest {
            subject: subject.map(str::to_string),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn custom_email_requires_subject_and_message() {
        for (subject, message) in [
            (None, None),
            (Some("Overdue notice"), None),
            (None, Some("Please return the book.")),
            (Some(""), Some("Please return the book.")),
            (Some("Overdue notice"), Some("   ")),
        ] {
            let err = custom_email_fields(&email_request(subject, message)).unwrap_err();
            assert!(
                matches!(err, Error::Validation(_)),
                "expected validation error for {subject:?} / {message:?}"
            );
        }
    }

    #[test]
    fn custom_email_fields_are_trimmed() {
        let request = email_request(Some("  Overdue notice  "), Some(" Please return it. "));
        let (subject, message) = custom_email_fields(&request).unwrap();
        assert_eq!(subject, "Overdue notice");
        assert_eq!(message, "Please return it.");
    }

    #[tokio::test]
    async fn foreign_member_record_reads_as_missing() {
        let state = test_state().await;
        let category = state.store.insert_category("Fiction").await.unwrap();
        let book = state
            .store
            .insert_book(&BookInput {
                title: "Dune".into(),
                author: "Herbert".into(),
                category_id: category.id,
                isbn: "9780441013593".into(),
                status: None,
            })
            .await
            .unwrap();
        let alice = state
            .store
            .insert_user("alice", "a@example.com", "h", Role::Member)
            .await
            .unwrap();
        let bob = state
            .store
            .insert_user("bob", "b@example.com", "h", Role::Member)
            .await
            .unwrap();
        let admin = state
            .store
            .insert_user("root", "r@example.com", "h", Role::Admin)
            .await
            .unwrap();

        let record = state
            .ledger
            .create_borrow(alice.id, book.id, None)
            .await
            .unwrap();

        // Another member gets the unknown-id answer, not a denial.
        let err = load_gated(&state, &bob, record.id, Action::Retrieve)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Owner and staff still see the record.
        assert!(load_gated(&state, &alice, record.id, Action::Retrieve)
            .await
            .is_ok());
        assert!(load_gated(&state, &admin, record.id, Action::Retrieve)
            .await
            .is_ok());
    }
}
