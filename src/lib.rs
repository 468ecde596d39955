//! circdesk - library circulation backend.
//!
//! Tracks a book catalog, member accounts with roles, and the borrow
//! ledger that ties them together: loans, returns, overdue fines, and
//! due-date notifications.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        REST API (axum)                      │
//! │  users / books / categories / borrow-records / status       │
//! └───────────────┬──────────────────────────┬──────────────────┘
//!                 │ authorize()              │
//! ┌───────────────┴───────────┐  ┌───────────┴──────────────────┐
//! │       ACCESS POLICY       │  │        BORROW LEDGER         │
//! │  pure role/action checks  │  │  create / return / fines /   │
//! └───────────────────────────┘  │  due-notification sweep      │
//!                                └───────┬──────────────┬───────┘
//!                                        │              │
//!                          ┌─────────────┴───┐  ┌───────┴───────┐
//!                          │  STORE (sqlx)   │  │    MAILER     │
//!                          │  SQLite, txns   │  │  fire-forget  │
//!                          └─────────────────┘  └───────────────┘
//! ```
//!
//! # Key Properties
//!
//! - **Status invariant**: a book is `borrowed` iff exactly one open
//!   record references it; both sides of every flip commit together
//! - **Deterministic fines**: derived once from (return date, due date),
//!   never silently recomputed
//! - **Uniform failures**: every error leaves through one envelope

// === Core Modules ===

/// Borrow/return/fine workflow.
pub mod ledger;

/// Role-based access policy.
pub mod policy;

/// SQLite persistence.
pub mod store;

/// REST API.
pub mod api;

/// Password hashing and bearer tokens.
pub mod auth;

/// Outbound email dispatch.
pub mod notify;

// === Supporting Modules ===

/// Service configuration.
pub mod config;

/// Error taxonomy and response envelope.
pub mod error;

// === Re-exports ===

pub use config::{AppConfig, MailConfig};
pub use error::{Error, Result};
pub use ledger::{recompute_fine, Ledger};
pub use policy::{authorize, Action, Resource, Role};
pub use store::Store;
