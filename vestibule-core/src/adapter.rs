//! Host container adapter seam.

use crate::error::BackendResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle to a flush hook installed in the host's request pipeline.
///
/// Returned by [`HostAdapter::register_flush_hook`] and handed back on
/// deregistration; the store never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushRegistration(u64);

impl FlushRegistration {
    /// Create a registration token. Adapters choose the identifier scheme.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The adapter-assigned identifier.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Capability for reaching host container internals.
///
/// The concrete adapter is chosen by the bootstrap layer and injected at
/// store construction; the store only uses it to install and remove the
/// hook that flushes a session after each request completes.
#[async_trait]
pub trait HostAdapter: Send + Sync {
    /// Install the post-request flush hook in the host's pipeline.
    async fn register_flush_hook(&self) -> BackendResult<FlushRegistration>;

    /// Remove a previously installed flush hook.
    async fn deregister_flush_hook(&self, registration: FlushRegistration) -> BackendResult<()>;
}

/// Adapter for hosts without a request pipeline: registrations succeed and
/// install nothing.
#[derive(Default)]
pub struct NoopHostAdapter {
    next_id: AtomicU64,
}

impl NoopHostAdapter {
    /// Create a no-op adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HostAdapter for NoopHostAdapter {
    async fn register_flush_hook(&self) -> BackendResult<FlushRegistration> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(FlushRegistration::new(id))
    }

    async fn deregister_flush_hook(&self, _registration: FlushRegistration) -> BackendResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_adapter_hands_out_distinct_tokens() {
        let adapter = NoopHostAdapter::new();
        let a = adapter.register_flush_hook().await.unwrap();
        let b = adapter.register_flush_hook().await.unwrap();
        assert_ne!(a, b);
        adapter.deregister_flush_hook(a).await.unwrap();
        adapter.deregister_flush_hook(b).await.unwrap();
    }
}
