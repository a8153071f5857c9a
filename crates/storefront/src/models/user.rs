//! User domain types.

use chrono::{DateTime, Utc};

use streetlab_core::{Email, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Display name, shown in the header once logged in.
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
