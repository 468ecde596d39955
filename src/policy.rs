//! Role-based access policy.
//!
//! One pure function decides every action. Handlers call
//! [`authorize`] before touching the store; list endpoints additionally
//! row-filter borrow records for members (a member only ever sees their
//! own loans).

use serde::{Deserialize, Serialize};

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

impl Role {
    /// Admins and librarians act on all records; members only on their own.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Librarian)
    }
}

/// Action the caller is attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    /// Current-user profile lookup.
    Me,
    /// Return a borrowed book.
    Return,
    /// Due-notification sweep over open records.
    Sweep,
    ListUnpaidFines,
    MarkFinePaid,
    /// Custom email to a borrower.
    SendEmail,
}

/// Resource the action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Book,
    Category,
    BorrowRecord,
}

/// Decide whether `role` may perform `action` on `resource`.
///
/// `role` is `None` for unauthenticated callers. `owner` is true when the
/// target row belongs to the caller (only meaningful for borrow records).
pub fn authorize(role: Option<Role>, action: Action, resource: Resource, owner: bool) -> bool {
    // Account registration is the only anonymous action.
    let Some(role) = role else {
        return resource == Resource::User && action == Action::Create;
    };

    let staff = role.is_staff();

    match resource {
        Resource::User => match action {
            Action::List | Action::Delete => staff,
            Action::Create | Action::Retrieve | Action::Update | Action::Me => true,
            _ => role == Role::Admin,
        },

        Resource::Book | Resource::Category => match action {
            Action::List | Action::Retrieve => true,
            Action::Create | Action::Update | Action::Delete => staff,
            _ => false,
        },

        Resource::BorrowRecord => match action {
            // Row-filtered in the list queries themselves.
            Action::List => true,
            Action::Create | Action::Retrieve | Action::Return | Action::Delete => staff || owner,
            Action::Sweep | Action::ListUnpaidFines | Action::MarkFinePaid => role == Role::Admin,
            Action::SendEmail => staff,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_can_only_register() {
        assert!(authorize(None, Action::Create, Resource::User, false));
        assert!(!authorize(None, Action::List, Resource::Book, false));
        assert!(!authorize(None, Action::Retrieve, Resource::Book, false));
        assert!(!authorize(None, Action::Create, Resource::BorrowRecord, true));
    }

    #[test]
    fn member_cannot_write_catalog() {
        for action in [Action::Create, Action::Update, Action::Delete] {
            assert!(!authorize(Some(Role::Member), action, Resource::Book, false));
            assert!(authorize(Some(Role::Admin), action, Resource::Book, false));
            assert!(authorize(Some(Role::Librarian), action, Resource::Book, false));
        }
        assert!(authorize(Some(Role::Member), Action::List, Resource::Book, false));
    }

    #[test]
    fn category_writes_are_staff_only() {
        assert!(!authorize(Some(Role::Member), Action::Delete, Resource::Category, false));
        assert!(authorize(Some(Role::Librarian), Action::Create, Resource::Category, false));
        assert!(authorize(Some(Role::Member), Action::Retrieve, Resource::Category, false));
    }

    #[test]
    fn user_listing_requires_staff() {
        assert!(!authorize(Some(Role::Member), Action::List, Resource::User, false));
        assert!(authorize(Some(Role::Librarian), Action::List, Resource::User, false));
        assert!(authorize(Some(Role::Admin), Action::Delete, Resource::User, false));
        assert!(!authorize(Some(Role::Member), Action::Delete, Resource::User, false));
        // Profile lookup stays open to everyone authenticated.
        assert!(authorize(Some(Role::Member), Action::Me, Resource::User, false));
    }

    #[test]
    fn members_act_on_own_records_only() {
        let r = Resource::BorrowRecord;
        assert!(authorize(Some(Role::Member), Action::Return, r, true));
        assert!(!authorize(Some(Role::Member), Action::Return, r, false));
        assert!(authorize(Some(Role::Librarian), Action::Return, r, false));
        assert!(authorize(Some(Role::Admin), Action::Retrieve, r, false));
    }

    #[test]
    fn fine_administration_is_admin_only() {
        let r = Resource::BorrowRecord;
        for action in [Action::Sweep, Action::ListUnpaidFines, Action::MarkFinePaid] {
            assert!(authorize(Some(Role::Admin), action, r, false));
            assert!(!authorize(Some(Role::Librarian), action, r, false));
            assert!(!authorize(Some(Role::Member), action, r, true));
        }
        // Custom borrower email is open to librarians as well.
        assert!(authorize(Some(Role::Librarian), Action::SendEmail, r, false));
        assert!(!authorize(Some(Role::Member), Action::SendEmail, r, true));
    }
}
