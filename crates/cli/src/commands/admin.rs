//! Administrator account management.
//!
//! # Usage
//!
//! ```bash
//! streetlab admin create -e admin@streetlab.com.br -n "Admin" -p 'long-password'
//! ```
//!
//! If the email already has an account it is promoted to admin instead; its
//! password is left unchanged.

use sqlx::PgPool;

use streetlab_core::Email;
use streetlab_storefront::db::UserRepository;
use streetlab_storefront::services::{AuthError, AuthService};

use super::CommandError;

/// Create an administrator, or promote the existing account with this email.
///
/// Returns the user's id.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    password: &str,
) -> Result<i32, CommandError> {
    tracing::info!("Creating admin user: {email}");

    match AuthService::new(pool).create_admin(name, email, password).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Admin user created");
            Ok(user.id.as_i32())
        }
        Err(AuthError::UserAlreadyExists) => {
            let email = Email::parse(email).map_err(AuthError::from)?;
            let user = UserRepository::new(pool).promote_to_admin(&email).await?;
            tracing::info!(user_id = %user.id, "Existing user promoted to admin");
            Ok(user.id.as_i32())
        }
        Err(err) => Err(err.into()),
    }
}
