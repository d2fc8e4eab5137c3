//! Postgres connection pooling.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use eventide_core::config::DatabaseConfig;

use crate::db::DbProvider;
use crate::error::DbResult;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'pool> = PooledConnection<'pool, AsyncPgConnection>;

/// How long a caller waits for a pooled connection.
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// ## Summary
/// Builds the pool for the configured database. Connections are opened on
/// first use and at least one is always allowed.
///
/// ## Errors
/// Returns an error if the pool cannot be built for the configured URL.
#[tracing::instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.url.as_str());

    let pool = Pool::builder()
        .max_size(u32::from(config.max_connections.max(1)))
        .min_idle(None)
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)
        .await?;

    tracing::debug!("Database pool ready");

    Ok(pool)
}

impl DbProvider for DbPool {
    fn get_connection<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = DbResult<DbConnection<'a>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.get().await?) })
    }
}
