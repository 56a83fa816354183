//! `PostgreSQL` collaborators for Gatherly.
//!
//! - [`PostgresNotificationStore`]: durable notifications with the
//!   non-terminal update guard
//! - [`PostgresDirectory`]: events, RSVPs, groups and users
//!
//! Queries are built at runtime with `sqlx::query` so the crate compiles
//! without a live database. The schema ships as embedded migrations; call
//! [`migrate`] once at startup.
//!
//! # Example
//!
//! ```no_run
//! use gatherly_postgres::{PostgresDirectory, PostgresNotificationStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = sqlx::PgPool::connect("postgres://localhost/gatherly").await?;
//! gatherly_postgres::migrate(&pool).await?;
//!
//! let store = PostgresNotificationStore::new(pool.clone());
//! let directory = PostgresDirectory::new(pool);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod store;

pub use directory::PostgresDirectory;
pub use store::PostgresNotificationStore;

use gatherly_rsvp::NotifyError;
use sqlx::PgPool;

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns [`NotifyError::StoreError`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), NotifyError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| NotifyError::StoreError(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Wrap a database error with what was being attempted.
fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> NotifyError {
    move |e| NotifyError::StoreError(format!("{context}: {e}"))
}

/// A stored value that does not decode into a domain type.
fn corrupt_row(e: impl std::fmt::Display) -> NotifyError {
    NotifyError::StoreError(format!("Corrupt row: {e}"))
}
