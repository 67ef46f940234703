//! Cluster-aware Redis backend.

use crate::single::SESSIONS_KEY_SET;
use crate::RedisClusterConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::AsyncCommands;
use tracing::debug;
use vestibule_core::{Backend, BackendError, BackendFactory, BackendResult};

/// A [`Backend`] persisting sessions in a Redis cluster.
///
/// Unlike [`RedisBackend`](crate::RedisBackend), mutations here are issued
/// as sequential commands: the session key and the key-set hash to
/// different slots, and MULTI/EXEC cannot span slots. A crash between the
/// two commands can leave the key-set briefly out of step until the next
/// mutation of the same key; callers wanting the strict invariant should
/// use the single-node backend.
pub struct RedisClusterBackend {
    config: RedisClusterConfig,
    conn: RwLock<Option<ClusterConnection>>,
}

impl RedisClusterBackend {
    /// Create a backend from its configuration. No connection is made until
    /// [`start`](Backend::start).
    pub fn new(config: RedisClusterConfig) -> Self {
        Self {
            config,
            conn: RwLock::new(None),
        }
    }

    fn conn(&self) -> BackendResult<ClusterConnection> {
        self.conn
            .read()
            .clone()
            .ok_or_else(|| BackendError::other("backend is not started"))
    }
}

#[async_trait]
impl Backend for RedisClusterBackend {
    fn name(&self) -> &str {
        "RedisClusterBackend"
    }

    async fn init(&self) -> BackendResult<()> {
        debug!("initializing");
        debug!(nodes = self.config.host_ports.len(), "... cluster nodes");
        debug!(password = self.config.password.is_some(), "... password?");
        debug!(timeout_ms = self.config.connection_timeout.as_millis() as u64, "... connection timeout");
        debug!(pool_size = self.config.pool_size, "... connection pool size");
        self.config.validate()
    }

    async fn start(&self) -> BackendResult<()> {
        debug!("starting");
        let client = ClusterClient::builder(self.config.node_urls())
            .connection_timeout(self.config.connection_timeout)
            .build()
            .map_err(BackendError::connection)?;
        let conn = client
            .get_async_connection()
            .await
            .map_err(BackendError::connection)?;
        *self.conn.write() = Some(conn);
        Ok(())
    }

    async fn stop(&self) -> BackendResult<()> {
        debug!("stopping");
        self.conn.write().take();
        Ok(())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        let mut conn = self.conn()?;
        let _: () = conn.set(key, value).await.map_err(BackendError::io)?;
        let _: () = conn
            .sadd(SESSIONS_KEY_SET, key)
            .await
            .map_err(BackendError::io)?;
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        let mut conn = self.conn()?;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(BackendError::io)?;
        Ok(value)
    }

    async fn remove(&self, key: &[u8]) -> BackendResult<()> {
        let mut conn = self.conn()?;
        let _: () = conn
            .srem(SESSIONS_KEY_SET, key)
            .await
            .map_err(BackendError::io)?;
        let _: () = conn.del(key).await.map_err(BackendError::io)?;
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        let mut conn = self.conn()?;

        // Point-in-time snapshot; keys added after it may survive the clear.
        let keys: Vec<Vec<u8>> = conn
            .smembers(SESSIONS_KEY_SET)
            .await
            .map_err(BackendError::io)?;
        if keys.is_empty() {
            return Ok(());
        }

        let _: () = conn
            .srem(SESSIONS_KEY_SET, &keys)
            .await
            .map_err(BackendError::io)?;
        for key in &keys {
            // Keys hash to different slots, so deletes cannot be batched.
            let _: () = conn.del(key.as_slice()).await.map_err(BackendError::io)?;
        }
        Ok(())
    }

    async fn size(&self) -> BackendResult<usize> {
        let mut conn = self.conn()?;
        let count: u64 = conn
            .scard(SESSIONS_KEY_SET)
            .await
            .map_err(BackendError::io)?;
        Ok(count as usize)
    }

    async fn keys(&self) -> BackendResult<Vec<Vec<u8>>> {
        let mut conn = self.conn()?;
        let keys: Vec<Vec<u8>> = conn
            .smembers(SESSIONS_KEY_SET)
            .await
            .map_err(BackendError::io)?;
        Ok(keys)
    }
}

/// [`BackendFactory`] producing [`RedisClusterBackend`]s from a captured
/// configuration.
pub struct RedisClusterBackendFactory {
    config: RedisClusterConfig,
}

impl RedisClusterBackendFactory {
    /// Create a factory for the given configuration.
    pub fn new(config: RedisClusterConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for RedisClusterBackendFactory {
    fn create(&self) -> BackendResult<Box<dyn Backend>> {
        Ok(Box::new(RedisClusterBackend::new(self.config.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_rejects_empty_node_list() {
        let config = RedisClusterConfig {
            host_ports: Vec::new(),
            password: None,
            connection_timeout: std::time::Duration::from_secs(5),
            pool_size: 8,
        };
        let backend = RedisClusterBackend::new(config);
        assert!(matches!(
            backend.init().await,
            Err(BackendError::Config(_))
        ));
    }

    #[test]
    fn factory_builds_fresh_backends() {
        let config = RedisClusterConfig::parse("a:7000,b:7001").unwrap();
        let factory = RedisClusterBackendFactory::new(config);
        let backend = factory.create().unwrap();
        assert_eq!(backend.name(), "RedisClusterBackend");
    }
}
