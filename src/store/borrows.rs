//! Borrow record rows and read queries.
//!
//! The state-changing operations (create, return, mark paid) live in
//! [`crate::ledger`] because they span multiple rows and must be
//! transactional.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::Result;

use super::Store;

/// One loan of one book to one user.
///
/// `fine_amount` is zero while the record is open; once `return_date` is
/// set it is derived from (return_date, due_date) and never recomputed.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BorrowRecord {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub fine_amount: i64,
    pub fine_paid: bool,
}

impl BorrowRecord {
    /// An open record is a book still out.
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

const SELECT_RECORD: &str = "SELECT id, user_id, book_id, borrow_date, due_date, return_date, \
     fine_amount, fine_paid FROM borrow_records";

impl Store {
    pub async fn get_borrow_record(&self, id: i64) -> Result<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!("{SELECT_RECORD} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// All records, staff view.
    pub async fn list_borrow_records(&self) -> Result<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(&format!("{SELECT_RECORD} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// Records belonging to one member.
    pub async fn list_borrow_records_for_user(&self, user_id: i64) -> Result<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(&format!(
            "{SELECT_RECORD} WHERE user_id = ? ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Records with an outstanding, unpaid fine.
    pub async fn list_unpaid_fines(&self) -> Result<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(&format!(
            "{SELECT_RECORD} WHERE fine_amount > 0 AND fine_paid = 0 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Open records whose due date has arrived or passed. Drives the
    /// notification sweep.
    pub async fn list_due_or_overdue(&self, at: DateTime<Utc>) -> Result<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(&format!(
            "{SELECT_RECORD} WHERE return_date IS NULL AND due_date <= ? ORDER BY id"
        ))
        .bind(at)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn delete_borrow_record(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM borrow_records WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
