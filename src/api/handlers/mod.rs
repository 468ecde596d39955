//! API request handlers.

pub mod auth;
pub mod books;
pub mod borrows;
pub mod categories;
pub mod status;
pub mod users;
