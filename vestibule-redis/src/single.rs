//! Single-node Redis backend.

use crate::pool::{RedisPool, RedisPoolBuilder};
use crate::RedisConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use tracing::debug;
use vestibule_core::{Backend, BackendError, BackendFactory, BackendResult};

/// Redis key of the set enumerating live session keys.
pub(crate) const SESSIONS_KEY_SET: &[u8] = b"sessions";

/// A [`Backend`] persisting sessions in a single Redis node through a
/// bounded connection pool.
///
/// Every value mutation is paired with the matching key-set update in one
/// MULTI/EXEC transaction, so the key-set and value mapping are never
/// observably out of step.
pub struct RedisBackend {
    config: RedisConfig,
    pool: RwLock<Option<RedisPool>>,
}

impl RedisBackend {
    /// Create a backend from its configuration. No connection is made until
    /// [`start`](Backend::start).
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    fn pool(&self) -> BackendResult<RedisPool> {
        self.pool
            .read()
            .clone()
            .ok_or_else(|| BackendError::other("backend is not started"))
    }
}

#[async_trait]
impl Backend for RedisBackend {
    fn name(&self) -> &str {
        "RedisBackend"
    }

    async fn init(&self) -> BackendResult<()> {
        debug!("initializing");
        debug!(host = %self.config.host, "... host");
        debug!(port = self.config.port, "... port");
        debug!(database = self.config.database, "... database");
        debug!(password = self.config.password.is_some(), "... password?");
        debug!(timeout_ms = self.config.connection_timeout.as_millis() as u64, "... connection timeout");
        debug!(pool_size = self.config.pool_size, "... connection pool size");
        self.config.validate()
    }

    async fn start(&self) -> BackendResult<()> {
        debug!("starting");
        let pool = RedisPoolBuilder::new(self.config.clone()).build().await?;
        *self.pool.write() = Some(pool);
        Ok(())
    }

    async fn stop(&self) -> BackendResult<()> {
        debug!("stopping");
        // Dropping the pool closes its connections.
        self.pool.write().take();
        Ok(())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        let pool = self.pool()?;
        let mut conn = pool.get().await.map_err(BackendError::pool)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(key, value)
            .ignore()
            .sadd(SESSIONS_KEY_SET, key)
            .ignore();
        let _: () = pipe
            .query_async(&mut *conn)
            .await
            .map_err(BackendError::io)?;
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        let pool = self.pool()?;
        let mut conn = pool.get().await.map_err(BackendError::pool)?;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(BackendError::io)?;
        Ok(value)
    }

    async fn remove(&self, key: &[u8]) -> BackendResult<()> {
        let pool = self.pool()?;
        let mut conn = pool.get().await.map_err(BackendError::pool)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .srem(SESSIONS_KEY_SET, key)
            .ignore()
            .del(key)
            .ignore();
        let _: () = pipe
            .query_async(&mut *conn)
            .await
            .map_err(BackendError::io)?;
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        let pool = self.pool()?;
        let mut conn = pool.get().await.map_err(BackendError::pool)?;

        // Point-in-time snapshot; keys added after it may survive the clear.
        let keys: Vec<Vec<u8>> = conn
            .smembers(SESSIONS_KEY_SET)
            .await
            .map_err(BackendError::io)?;
        if keys.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.srem(SESSIONS_KEY_SET, &keys).ignore();
        for key in &keys {
            pipe.del(key.as_slice()).ignore();
        }
        let _: () = pipe
            .query_async(&mut *conn)
            .await
            .map_err(BackendError::io)?;
        Ok(())
    }

    async fn size(&self) -> BackendResult<usize> {
        let pool = self.pool()?;
        let mut conn = pool.get().await.map_err(BackendError::pool)?;
        let count: u64 = conn
            .scard(SESSIONS_KEY_SET)
            .await
            .map_err(BackendError::io)?;
        Ok(count as usize)
    }

    async fn keys(&self) -> BackendResult<Vec<Vec<u8>>> {
        let pool = self.pool()?;
        let mut conn = pool.get().await.map_err(BackendError::pool)?;
        let keys: Vec<Vec<u8>> = conn
            .smembers(SESSIONS_KEY_SET)
            .await
            .map_err(BackendError::io)?;
        Ok(keys)
    }
}

/// [`BackendFactory`] producing [`RedisBackend`]s from a captured
/// configuration.
pub struct RedisBackendFactory {
    config: RedisConfig,
}

impl RedisBackendFactory {
    /// Create a factory for the given configuration.
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for RedisBackendFactory {
    fn create(&self) -> BackendResult<Box<dyn Backend>> {
        Ok(Box::new(RedisBackend::new(self.config.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_surfaces_configuration_errors() {
        let backend = RedisBackend::new(RedisConfig::new("h").with_pool_size(0));
        assert!(matches!(
            backend.init().await,
            Err(BackendError::Config(_))
        ));
    }

    #[tokio::test]
    async fn operations_before_start_report_not_started() {
        let backend = RedisBackend::new(RedisConfig::default());
        assert!(backend.get(b"k").await.is_err());
    }

    #[test]
    fn factory_builds_fresh_backends() {
        let factory = RedisBackendFactory::new(RedisConfig::default());
        let backend = factory.create().unwrap();
        assert_eq!(backend.name(), "RedisBackend");
    }
}
