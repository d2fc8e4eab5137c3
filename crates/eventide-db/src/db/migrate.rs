use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::{DbError, DbResult};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// ## Summary
/// Applies pending schema migrations over a dedicated blocking connection.
///
/// ## Errors
/// Returns `DbError::MigrationError` if connecting or migrating fails.
#[tracing::instrument(skip(database_url))]
pub async fn run_migrations(database_url: &str) -> DbResult<()> {
    let url = database_url.to_string();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url)
            .map_err(|e| DbError::MigrationError(format!("Failed to connect: {e}")))?;
        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::MigrationError(format!("Failed to run migrations: {e}")))?;
        Ok::<_, DbError>(versions.len())
    })
    .await
    .map_err(|e| DbError::MigrationError(format!("Migration task failed: {e}")))??;

    tracing::info!(applied, "Database migrations complete");

    Ok(())
}
