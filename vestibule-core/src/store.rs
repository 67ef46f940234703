//! Lifecycle-governed session store facade.

use crate::adapter::{FlushRegistration, HostAdapter, NoopHostAdapter};
use crate::backend::Backend;
use crate::config::StoreConfig;
use crate::error::{BackendError, BackendResult, StoreError, StoreResult};
use crate::lifecycle::{
    LifecycleContext, LifecycleListener, LifecycleState, LifecycleStateMachine,
};
use crate::spy::BackendSpy;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Produces a fresh [`Backend`] for each store initialization.
///
/// Implemented for closures, so a factory can be as small as
/// `|| Ok(Box::new(MemoryBackend::new()) as Box<dyn Backend>)`.
pub trait BackendFactory: Send + Sync {
    /// Create a new backend instance from the factory's configuration.
    fn create(&self) -> BackendResult<Box<dyn Backend>>;
}

impl<F> BackendFactory for F
where
    F: Fn() -> BackendResult<Box<dyn Backend>> + Send + Sync,
{
    fn create(&self) -> BackendResult<Box<dyn Backend>> {
        self()
    }
}

/// Everything the write lock protects: the live backend slot and the flush
/// hook registration. The backend reference is only ever *replaced* here,
/// never mutated in place, so readers under the read lock always see a fully
/// constructed instance.
struct StoreInner {
    config: StoreConfig,
    factory: Arc<dyn BackendFactory>,
    adapter: Arc<dyn HostAdapter>,
    backend: Option<Arc<dyn Backend>>,
    flush_hook: Option<FlushRegistration>,
}

#[async_trait]
impl LifecycleContext for StoreInner {
    async fn do_init(&mut self) -> Result<(), BackendError> {
        let backend = self.factory.create()?;
        let backend: Arc<dyn Backend> = if self.config.spy_enabled {
            Arc::new(BackendSpy::new(Arc::from(backend)))
        } else {
            Arc::from(backend)
        };
        backend.init().await?;
        self.backend = Some(backend);
        Ok(())
    }

    async fn do_start(&mut self) -> Result<(), BackendError> {
        if self.config.flush_hook_enabled {
            let registration = self.adapter.register_flush_hook().await?;
            debug!(id = registration.id(), "flush hook registered");
            self.flush_hook = Some(registration);
        }

        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| BackendError::other("no backend to start"))?
            .clone();

        if let Err(err) = backend.start().await {
            // No orphaned registration may survive a failed start.
            if let Some(registration) = self.flush_hook.take() {
                if let Err(rollback) = self.adapter.deregister_flush_hook(registration).await {
                    warn!(error = %rollback, "flush hook rollback failed");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    async fn do_stop(&mut self) -> Result<(), BackendError> {
        // Deregister first: the hook must not fire against a backend
        // mid-shutdown, and it comes off even if the backend fails to stop.
        if let Some(registration) = self.flush_hook.take() {
            if let Err(err) = self.adapter.deregister_flush_hook(registration).await {
                warn!(error = %err, "flush hook deregistration failed");
            }
        }

        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| BackendError::other("no backend to stop"))?
            .clone();
        backend.stop().await
    }

    async fn do_destroy(&mut self) -> Result<(), BackendError> {
        // The discarded backend is never reused.
        self.backend = None;
        self.flush_hook = None;
        Ok(())
    }
}

/// A session store that drives a pluggable [`Backend`] through a
/// [`LifecycleStateMachine`] and guards it with a reader/writer lock.
///
/// Lifecycle transitions ([`init`](Self::init), [`start`](Self::start),
/// [`stop`](Self::stop), [`destroy`](Self::destroy)) hold the exclusive
/// writer lock for their full duration. Facade operations
/// ([`save`](Self::save), [`load`](Self::load), [`remove`](Self::remove),
/// [`clear`](Self::clear), [`keys`](Self::keys), [`size`](Self::size)) hold
/// the shared reader lock, so many may run in parallel against the backend
/// but none overlaps a lifecycle transition. A save can therefore never
/// observe a backend mid-construction, and a stop can never release
/// resources while a save is in flight.
///
/// Because every transition is exclusive, the backends a store uses over its
/// life are totally ordered: at most one is live (between start and stop) at
/// any time.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vestibule_core::{Backend, MemoryBackend, SessionStore, StoreConfig};
///
/// # async fn example() -> Result<(), vestibule_core::StoreError> {
/// let store = SessionStore::new(
///     StoreConfig::new(),
///     Arc::new(|| Ok(Box::new(MemoryBackend::new()) as Box<dyn Backend>)),
/// );
///
/// store.start().await?;
/// store.save("abc", &[0x01, 0x02]).await?;
/// assert_eq!(store.load("abc").await?, Some(vec![0x01, 0x02]));
/// store.stop().await?;
/// store.destroy().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionStore {
    lifecycle: LifecycleStateMachine,
    inner: RwLock<StoreInner>,
}

impl SessionStore {
    /// Create a store with no host pipeline (a [`NoopHostAdapter`]).
    pub fn new(config: StoreConfig, factory: Arc<dyn BackendFactory>) -> Self {
        Self::with_adapter(config, factory, Arc::new(NoopHostAdapter::new()))
    }

    /// Create a store wired to a host container through `adapter`.
    pub fn with_adapter(
        config: StoreConfig,
        factory: Arc<dyn BackendFactory>,
        adapter: Arc<dyn HostAdapter>,
    ) -> Self {
        Self {
            lifecycle: LifecycleStateMachine::new(),
            inner: RwLock::new(StoreInner {
                config,
                factory,
                adapter,
                backend: None,
                flush_hook: None,
            }),
        }
    }

    // -------------------------------------------------------------------
    //   lifecycle boundary
    // -------------------------------------------------------------------

    /// Initialize the store: construct a fresh backend and run its `init`.
    pub async fn init(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        self.lifecycle.init(&mut *inner).await?;
        Ok(())
    }

    /// Start the store. From `NEW` this initializes first.
    pub async fn start(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        self.lifecycle.start(&mut *inner).await?;
        Ok(())
    }

    /// Stop the store, releasing the backend's resources.
    pub async fn stop(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        self.lifecycle.stop(&mut *inner).await?;
        Ok(())
    }

    /// Tear the store down, discarding the backend.
    pub async fn destroy(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        self.lifecycle.destroy(&mut *inner).await?;
        Ok(())
    }

    /// Current lifecycle state. Lock-free; never observes a torn write.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Current lifecycle state's canonical name.
    pub fn state_name(&self) -> &'static str {
        self.lifecycle.state_name()
    }

    /// Register a lifecycle listener.
    pub fn add_lifecycle_listener(&self, listener: Arc<dyn LifecycleListener>) {
        self.lifecycle.add_lifecycle_listener(listener);
    }

    /// Remove a previously registered lifecycle listener.
    pub fn remove_lifecycle_listener(&self, listener: &Arc<dyn LifecycleListener>) {
        self.lifecycle.remove_lifecycle_listener(listener);
    }

    /// Enumerate registered lifecycle listeners.
    pub fn find_lifecycle_listeners(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.lifecycle.find_lifecycle_listeners()
    }

    // -------------------------------------------------------------------
    //   facade boundary
    // -------------------------------------------------------------------

    /// Persist a session payload under `id`.
    pub async fn save(&self, id: &str, payload: &[u8]) -> StoreResult<()> {
        debug!(session = id, "saving session");
        let inner = self.inner.read().await;
        let backend = self.live_backend(&inner)?;
        backend.put(id.as_bytes(), payload).await?;
        Ok(())
    }

    /// Load the payload saved under `id`, or `None` if no such session.
    pub async fn load(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        debug!(session = id, "loading session");
        let inner = self.inner.read().await;
        let backend = self.live_backend(&inner)?;
        Ok(backend.get(id.as_bytes()).await?)
    }

    /// Remove the session saved under `id`. Removing an unknown id is not
    /// an error.
    pub async fn remove(&self, id: &str) -> StoreResult<()> {
        debug!(session = id, "removing session");
        let inner = self.inner.read().await;
        let backend = self.live_backend(&inner)?;
        backend.remove(id.as_bytes()).await?;
        Ok(())
    }

    /// Remove all sessions.
    pub async fn clear(&self) -> StoreResult<()> {
        debug!("clearing sessions");
        let inner = self.inner.read().await;
        let backend = self.live_backend(&inner)?;
        backend.clear().await?;
        Ok(())
    }

    /// All live session ids, unordered.
    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        debug!("listing sessions");
        let inner = self.inner.read().await;
        let backend = self.live_backend(&inner)?;
        backend
            .keys()
            .await?
            .into_iter()
            .map(|key| {
                String::from_utf8(key)
                    .map_err(|err| StoreError::Backend(BackendError::encoding(err)))
            })
            .collect()
    }

    /// Number of live sessions.
    pub async fn size(&self) -> StoreResult<usize> {
        debug!("counting sessions");
        let inner = self.inner.read().await;
        let backend = self.live_backend(&inner)?;
        Ok(backend.size().await?)
    }

    /// The live backend, valid only while `STARTED`.
    ///
    /// The state read is stable for the duration of the caller's read-lock
    /// section: transitions need the write lock.
    fn live_backend<'a>(&self, inner: &'a StoreInner) -> StoreResult<&'a Arc<dyn Backend>> {
        if self.lifecycle.state() != LifecycleState::Started {
            return Err(StoreError::NotStarted);
        }
        inner.backend.as_ref().ok_or(StoreError::NotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn memory_store(config: StoreConfig) -> SessionStore {
        SessionStore::new(
            config,
            Arc::new(|| Ok(Box::new(MemoryBackend::new()) as Box<dyn Backend>)),
        )
    }

    #[tokio::test]
    async fn facade_rejects_calls_before_start() {
        let store = memory_store(StoreConfig::new());
        assert!(matches!(
            store.save("abc", b"payload").await,
            Err(StoreError::NotStarted)
        ));

        store.init().await.unwrap();
        assert!(matches!(
            store.load("abc").await,
            Err(StoreError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn facade_rejects_calls_after_stop() {
        let store = memory_store(StoreConfig::new());
        store.start().await.unwrap();
        store.save("abc", b"payload").await.unwrap();
        store.stop().await.unwrap();

        assert!(matches!(
            store.load("abc").await,
            Err(StoreError::NotStarted)
        ));
        assert_eq!(store.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn session_ids_round_trip_through_key_encoding() {
        let store = memory_store(StoreConfig::new());
        store.start().await.unwrap();

        let ids = ["abc", "F00D-42", "sésame"];
        for id in ids {
            store.save(id, id.as_bytes()).await.unwrap();
        }

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        let mut expected: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(keys, expected);
    }
}
