//! Redis connection pool.

use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use tracing::info;
use vestibule_core::{BackendError, BackendResult};

use crate::RedisConfig;

/// Type alias for the connection pool.
pub type RedisPool = Pool<RedisConnectionManager>;

/// Builder for creating Redis connection pools.
pub struct RedisPoolBuilder {
    config: RedisConfig,
}

impl RedisPoolBuilder {
    /// Create a new pool builder.
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    /// Build the connection pool, bounded by the configured pool size and
    /// connection timeout, and verify it with a PING.
    pub async fn build(self) -> BackendResult<RedisPool> {
        let url = self.config.connection_url();

        let manager =
            RedisConnectionManager::new(url).map_err(BackendError::connection)?;

        let pool = Pool::builder()
            .max_size(self.config.pool_size)
            .connection_timeout(self.config.connection_timeout)
            .build(manager)
            .await
            .map_err(BackendError::pool)?;

        // Test the connection in a scope so it returns to the pool before
        // the pool is handed out.
        {
            let mut conn = pool.get().await.map_err(BackendError::pool)?;
            let _: String = redis::cmd("PING")
                .query_async(&mut *conn)
                .await
                .map_err(BackendError::connection)?;
        }

        info!(
            pool_size = self.config.pool_size,
            host = %self.config.host,
            port = self.config.port,
            "Redis connection pool created"
        );

        Ok(pool)
    }
}
