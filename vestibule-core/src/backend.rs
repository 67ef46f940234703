//! Backend contract.

use crate::error::BackendResult;
use async_trait::async_trait;

/// A key/value resource with lifecycle hooks, used by a
/// [`SessionStore`](crate::store::SessionStore) to persist sessions.
///
/// Keys and values are opaque byte sequences; semantically a key is a session
/// identifier and a value is a serialized session. Alongside the value
/// mapping every backend maintains a key-set enumerating the live keys, and
/// keeps the two consistent: a key is in the key-set exactly when it has a
/// value, at every instant visible to external observers.
///
/// A backend instance is created fresh for each store initialization and
/// discarded on destroy. `init` is called once and acquires no resources;
/// `start` is called once and acquires them; `stop` is called once and
/// releases them. Mutation and query operations are only valid between
/// `start` and `stop`; the session store's lifecycle ordering enforces
/// this, so implementations need no state checks of their own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend identity, used to tag instrumentation records.
    fn name(&self) -> &str;

    /// Prepare the backend to be started. Validates and logs configuration
    /// only; acquires no system resources.
    async fn init(&self) -> BackendResult<()>;

    /// Acquire the backend's resources (connections, pools). When this
    /// returns, the backend is ready to manage session data.
    async fn start(&self) -> BackendResult<()>;

    /// Release all acquired resources. After this returns, no further
    /// operations are valid until a new `start`.
    async fn stop(&self) -> BackendResult<()>;

    /// Upsert `value` under `key` and insert `key` into the key-set, as one
    /// atomic unit: both effects become visible together or neither does.
    async fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()>;

    /// Return the value mapped to `key`, or `None` if absent. Never returns
    /// partial data.
    async fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>>;

    /// Delete the value under `key` and remove `key` from the key-set
    /// atomically. Removing an absent key is not an error.
    async fn remove(&self, key: &[u8]) -> BackendResult<()>;

    /// Remove all known keys and their values. Operates on a point-in-time
    /// snapshot of the key-set: keys added concurrently during the clear are
    /// not guaranteed to be removed.
    async fn clear(&self) -> BackendResult<()>;

    /// Cardinality of the key-set.
    async fn size(&self) -> BackendResult<usize>;

    /// The full key-set, unordered.
    async fn keys(&self) -> BackendResult<Vec<Vec<u8>>>;
}
