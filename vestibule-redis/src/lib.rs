//! # Vestibule Redis
//!
//! Redis backends for the vestibule session store.
//!
//! ## Features
//!
//! - **Single node**: transactional backend over a bb8 connection pool
//! - **Cluster**: cluster-aware backend behind the `cluster` feature
//! - **Key-set tracking**: every stored session is also recorded in a
//!   Redis set, so enumeration never needs `KEYS`/`SCAN`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vestibule_core::{SessionStore, StoreConfig};
//! use vestibule_redis::{RedisBackendFactory, RedisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::new("localhost")
//!         .with_port(6379)
//!         .with_pool_size(10);
//!
//!     let store = SessionStore::new(
//!         StoreConfig::default(),
//!         Arc::new(RedisBackendFactory::new(config)),
//!     );
//!     store.start().await?;
//!
//!     store.save("sid-1", b"payload").await?;
//!     let session = store.load("sid-1").await?;
//!     assert!(session.is_some());
//!
//!     store.stop().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod pool;
mod single;

#[cfg(feature = "cluster")]
mod cluster;

pub use config::{parse_host_ports, RedisClusterConfig, RedisConfig};
pub use pool::{RedisPool, RedisPoolBuilder};
pub use single::{RedisBackend, RedisBackendFactory};

#[cfg(feature = "cluster")]
pub use cluster::{RedisClusterBackend, RedisClusterBackendFactory};

// Re-export redis crate for convenience
pub use redis;

/// Prelude for common imports.
///
/// ```
/// use vestibule_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisClusterConfig, RedisConfig};
    pub use crate::single::{RedisBackend, RedisBackendFactory};

    #[cfg(feature = "cluster")]
    pub use crate::cluster::{RedisClusterBackend, RedisClusterBackendFactory};
}
