//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` in order; already-applied
//! migrations are skipped by sqlx's bookkeeping table.

use sqlx::PgPool;

use super::CommandError;

/// Apply all pending migrations.
pub async fn run(pool: &PgPool) -> Result<(), CommandError> {
    tracing::info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;
    tracing::info!("Migrations complete");
    Ok(())
}
