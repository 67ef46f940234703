//! Backend instrumentation decorator.

use crate::backend::Backend;
use crate::error::BackendResult;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A [`Backend`] decorator that times every call and emits one structured
/// record per operation, tagged with the wrapped backend's identity.
///
/// The spy adds strictly zero semantic change: results and errors pass
/// through unchanged, so it can be inserted or removed without affecting
/// correctness, only observability.
pub struct BackendSpy {
    inner: Arc<dyn Backend>,
}

impl BackendSpy {
    /// Wrap a backend.
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self { inner }
    }

    async fn timed<T>(
        &self,
        operation: &str,
        call: impl Future<Output = BackendResult<T>>,
    ) -> BackendResult<T> {
        let started = Instant::now();
        let result = call.await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            backend = self.inner.name(),
            operation, elapsed_ms, "backend call"
        );
        result
    }
}

#[async_trait]
impl Backend for BackendSpy {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn init(&self) -> BackendResult<()> {
        self.timed("init", self.inner.init()).await
    }

    async fn start(&self) -> BackendResult<()> {
        self.timed("start", self.inner.start()).await
    }

    async fn stop(&self) -> BackendResult<()> {
        self.timed("stop", self.inner.stop()).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        self.timed("put", self.inner.put(key, value)).await
    }

    async fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        self.timed("get", self.inner.get(key)).await
    }

    async fn remove(&self, key: &[u8]) -> BackendResult<()> {
        self.timed("remove", self.inner.remove(key)).await
    }

    async fn clear(&self) -> BackendResult<()> {
        self.timed("clear", self.inner.clear()).await
    }

    async fn size(&self) -> BackendResult<usize> {
        self.timed("size", self.inner.size()).await
    }

    async fn keys(&self) -> BackendResult<Vec<Vec<u8>>> {
        self.timed("keys", self.inner.keys()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::memory::MemoryBackend;

    /// Backend whose every fallible operation fails the same way, for
    /// checking that the spy forwards errors untouched.
    struct BrokenBackend;

    #[async_trait]
    impl Backend for BrokenBackend {
        fn name(&self) -> &str {
            "BrokenBackend"
        }

        async fn init(&self) -> BackendResult<()> {
            Ok(())
        }

        async fn start(&self) -> BackendResult<()> {
            Err(BackendError::connection("refused"))
        }

        async fn stop(&self) -> BackendResult<()> {
            Err(BackendError::connection("refused"))
        }

        async fn put(&self, _key: &[u8], _value: &[u8]) -> BackendResult<()> {
            Err(BackendError::io("broken pipe"))
        }

        async fn get(&self, _key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
            Err(BackendError::io("broken pipe"))
        }

        async fn remove(&self, _key: &[u8]) -> BackendResult<()> {
            Err(BackendError::io("broken pipe"))
        }

        async fn clear(&self) -> BackendResult<()> {
            Err(BackendError::io("broken pipe"))
        }

        async fn size(&self) -> BackendResult<usize> {
            Err(BackendError::io("broken pipe"))
        }

        async fn keys(&self) -> BackendResult<Vec<Vec<u8>>> {
            Err(BackendError::io("broken pipe"))
        }
    }

    #[tokio::test]
    async fn spy_is_transparent_for_results() {
        let plain = MemoryBackend::new();
        let spied = BackendSpy::new(Arc::new(MemoryBackend::new()));

        for backend in [&plain as &dyn Backend, &spied as &dyn Backend] {
            backend.put(b"abc", &[1, 2]).await.unwrap();
            backend.put(b"def", &[3]).await.unwrap();
            backend.remove(b"def").await.unwrap();

            assert_eq!(backend.get(b"abc").await.unwrap(), Some(vec![1, 2]));
            assert_eq!(backend.get(b"def").await.unwrap(), None);
            assert_eq!(backend.size().await.unwrap(), 1);
            assert_eq!(backend.keys().await.unwrap(), vec![b"abc".to_vec()]);
        }
    }

    #[tokio::test]
    async fn spy_is_transparent_for_errors() {
        let spied = BackendSpy::new(Arc::new(BrokenBackend));

        let direct = BrokenBackend.put(b"k", b"v").await.unwrap_err();
        let through_spy = spied.put(b"k", b"v").await.unwrap_err();
        assert_eq!(direct.to_string(), through_spy.to_string());

        let direct = BrokenBackend.start().await.unwrap_err();
        let through_spy = spied.start().await.unwrap_err();
        assert_eq!(direct.to_string(), through_spy.to_string());

        assert!(spied.get(b"k").await.is_err());
        assert!(spied.clear().await.is_err());
    }

    #[tokio::test]
    async fn spy_reports_inner_identity() {
        let spied = BackendSpy::new(Arc::new(MemoryBackend::new()));
        assert_eq!(spied.name(), "MemoryBackend");
    }
}
