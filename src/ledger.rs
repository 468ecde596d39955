//! The borrow ledger: loan creation, returns, fines, and the
//! due-notification sweep.
//!
//! Every multi-row mutation runs in one store transaction so a book can
//! never be left `borrowed` with no open record, or `available` with one.
//! The availability check on borrow is a conditional UPDATE, so two
//! concurrent borrow attempts on the same book serialize at the store and
//! at most one succeeds.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::notify::Mailer;
use crate::store::{BorrowRecord, Store};

/// Fine for a record, in whole currency units.
///
/// Pure and idempotent: same inputs, same amount. Zero while the record
/// is open. Day counting is date-granular and inclusive, so returning on
/// the due date itself already counts as one day overdue.
pub fn recompute_fine(
    return_date: Option<DateTime<Utc>>,
    due_date: DateTime<Utc>,
    rate_per_day: i64,
) -> i64 {
    let Some(returned) = return_date else {
        return 0;
    };
    let days_overdue = (returned.date_naive() - due_date.date_naive()).num_days() + 1;
    if days_overdue > 0 {
        days_overdue * rate_per_day
    } else {
        0
    }
}

/// Outcome of a return, with the human-readable summary the API exposes.
#[derive(Debug)]
pub struct ReturnOutcome {
    pub record: BorrowRecord,
    pub message: String,
}

/// The workflow core. Owns the fine rules and the book-status invariant.
pub struct Ledger {
    store: Store,
    mailer: Arc<dyn Mailer>,
    fine_rate_per_day: i64,
    loan_period: Duration,
}

impl Ledger {
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, config: &AppConfig) -> Self {
        Self {
            store,
            mailer,
            fine_rate_per_day: config.fine_rate_per_day,
            loan_period: Duration::days(config.loan_period_days),
        }
    }

    /// Borrow a book for a user.
    ///
    /// Fails with `Conflict` unless the book is `available`. The record
    /// insert and the status flip commit together. A missing `due_date`
    /// gets the configured loan period from now.
    pub async fn create_borrow(
        &self,
        user_id: i64,
        book_id: i64,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<BorrowRecord> {
        let now = Utc::now();
        let due_date = due_date.unwrap_or(now + self.loan_period);

        let mut tx = self.store.pool().begin().await?;

        let exists = sqlx::query_as::<_, (i64,)>("SELECT id FROM books WHERE id = ?")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound("book"));
        }

        // Check-then-act guard: the flip only lands if the book is still
        // available inside this transaction.
        let flipped =
            sqlx::query("UPDATE books SET status = 'borrowed' WHERE id = ? AND status = 'available'")
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
        if flipped.rows_affected() == 0 {
            return Err(Error::Conflict(
                "this book is not available for borrowing".to_string(),
            ));
        }

        let id = sqlx::query(
            "INSERT INTO borrow_records \
             (user_id, book_id, borrow_date, due_date, return_date, fine_amount, fine_paid) \
             VALUES (?, ?, ?, ?, NULL, 0, 0)",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(due_date)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        tracing::info!(record_id = id, user_id, book_id, "borrow created");

        Ok(BorrowRecord {
            id,
            user_id,
            book_id,
            borrow_date: now,
            due_date,
            return_date: None,
            fine_amount: 0,
            fine_paid: false,
        })
    }

    /// Return a borrowed book now.
    pub async fn return_borrow(&self, record_id: i64) -> Result<ReturnOutcome> {
        self.return_borrow_at(record_id, Utc::now()).await
    }

    /// Return a borrowed book at an explicit time.
    ///
    /// Sets the return date, derives the fine, and releases the book, all
    /// in one transaction. A nonzero fine is marked paid immediately;
    /// that mirrors the system this replaces and is deliberate (see
    /// DESIGN.md).
    pub async fn return_borrow_at(
        &self,
        record_id: i64,
        at: DateTime<Utc>,
    ) -> Result<ReturnOutcome> {
        let mut tx = self.store.pool().begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            "SELECT id, user_id, book_id, borrow_date, due_date, return_date, fine_amount, \
             fine_paid FROM borrow_records WHERE id = ?",
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("borrow record"))?;

        if record.return_date.is_some() {
            return Err(Error::Conflict("book already returned".to_string()));
        }

        let fine_amount = recompute_fine(Some(at), record.due_date, self.fine_rate_per_day);
        let fine_paid = fine_amount > 0;

        let updated = sqlx::query(
            "UPDATE borrow_records SET return_date = ?, fine_amount = ?, fine_paid = ? \
             WHERE id = ? AND return_date IS NULL",
        )
        .bind(at)
        .bind(fine_amount)
        .bind(fine_paid)
        .bind(record_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::Conflict("book already returned".to_string()));
        }

        sqlx::query("UPDATE books SET status = 'available' WHERE id = ?")
            .bind(record.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(record_id, fine_amount, "borrow returned");

        let mut message = "Book returned successfully".to_string();
        if fine_amount > 0 {
            message.push_str(&format!(" with a fine of {fine_amount}"));
        }

        Ok(ReturnOutcome {
            record: BorrowRecord {
                return_date: Some(at),
                fine_amount,
                fine_paid,
                ..record
            },
            message,
        })
    }

    /// Mark an outstanding fine as settled. The amount never changes.
    pub async fn mark_fine_paid(&self, record_id: i64) -> Result<(BorrowRecord, String)> {
        let record = self
            .store
            .get_borrow_record(record_id)
            .await?
            .ok_or(Error::NotFound("borrow record"))?;

        if record.fine_paid {
            return Err(Error::Conflict("fine already marked as paid".to_string()));
        }

        let updated = sqlx::query(
            "UPDATE borrow_records SET fine_paid = 1 WHERE id = ? AND fine_paid = 0",
        )
        .bind(record_id)
        .execute(self.store.pool())
        .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::Conflict("fine already marked as paid".to_string()));
        }

        let book_title = self
            .store
            .get_book(record.book_id)
            .await?
            .map(|b| b.title)
            .unwrap_or_else(|| format!("book {}", record.book_id));

        let message = format!(
            "Fine of {} for {} marked as paid",
            record.fine_amount, book_title
        );

        Ok((
            BorrowRecord {
                fine_paid: true,
                ..record
            },
            message,
        ))
    }

    /// Records with an outstanding, unpaid fine.
    pub async fn list_unpaid_fines(&self) -> Result<Vec<BorrowRecord>> {
        self.store.list_unpaid_fines().await
    }

    /// Open records due at or before `at`.
    pub async fn list_due_or_overdue(&self, at: DateTime<Utc>) -> Result<Vec<BorrowRecord>> {
        self.store.list_due_or_overdue(at).await
    }

    /// Send one due notice per open record that is due or overdue.
    ///
    /// Best effort, no retry: the first transport failure aborts the
    /// sweep and surfaces to the caller; already-sent notices stand and
    /// no record is modified either way.
    pub async fn sweep(&self, at: DateTime<Utc>) -> Result<usize> {
        let records = self.store.list_due_or_overdue(at).await?;
        let mut count = 0;

        for record in &records {
            let user = self
                .store
                .get_user(record.user_id)
                .await?
                .ok_or(Error::NotFound("user"))?;
            let book = self
                .store
                .get_book(record.book_id)
                .await?
                .ok_or(Error::NotFound("book"))?;

            let body = format!(
                "The book '{}' you borrowed is due on {}. Please return it in time to avoid fines.",
                book.title,
                record.due_date.format("%Y-%m-%d"),
            );
            self.mailer
                .send(&user.email, "Library Book Due Notice", &body)
                .await?;
            count += 1;
        }

        tracing::info!(count, "due-notification sweep finished");
        Ok(count)
    }
}
