//! Session-related types.
//!
//! Everything the storefront keeps per visitor lives in the tower-sessions
//! store under the keys in [`keys`].

use serde::{Deserialize, Serialize};

use streetlab_core::{UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Role at login time.
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&crate::models::User> for CurrentUser {
    fn from(user: &crate::models::User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// One-shot messages shown on the next page view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flash(Vec<String>);

impl Flash {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<String> {
        self.0
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the serialized `CheckoutSession` (cart, shipping, order token).
    pub const CHECKOUT: &str = "checkout";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_serializes_as_list() {
        let mut flash = Flash::default();
        flash.push("Your cart is empty.");
        let json = serde_json::to_string(&flash).unwrap();
        assert_eq!(json, r#"["Your cart is empty."]"#);
    }

    #[test]
    fn test_current_user_admin_flag() {
        let user = CurrentUser {
            id: UserId::new(1),
            name: "Ana".to_owned(),
            role: UserRole::Admin,
        };
        assert!(user.is_admin());
    }
}
