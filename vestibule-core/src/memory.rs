//! In-process backend.

use crate::backend::Backend;
use crate::error::BackendResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    values: HashMap<Vec<u8>, Vec<u8>>,
    key_set: HashSet<Vec<u8>>,
}

/// A [`Backend`] holding sessions in process memory.
///
/// The value map and key-set live behind a single mutex, so the
/// key-set/value consistency invariant holds trivially. Useful as a
/// zero-dependency default and as the reference backend in tests; sessions
/// do not survive the process.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "MemoryBackend"
    }

    async fn init(&self) -> BackendResult<()> {
        debug!("initializing");
        Ok(())
    }

    async fn start(&self) -> BackendResult<()> {
        debug!("starting");
        Ok(())
    }

    async fn stop(&self) -> BackendResult<()> {
        debug!("stopping");
        self.state.lock().values.shrink_to_fit();
        Ok(())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.values.insert(key.to_vec(), value.to_vec());
        state.key_set.insert(key.to_vec());
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.state.lock().values.get(key).cloned())
    }

    async fn remove(&self, key: &[u8]) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.key_set.remove(key);
        state.values.remove(key);
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        let mut state = self.state.lock();
        // Snapshot-then-delete, matching the contract's clear semantics.
        let snapshot: Vec<Vec<u8>> = state.key_set.iter().cloned().collect();
        for key in snapshot {
            state.key_set.remove(&key);
            state.values.remove(&key);
        }
        Ok(())
    }

    async fn size(&self) -> BackendResult<usize> {
        Ok(self.state.lock().key_set.len())
    }

    async fn keys(&self) -> BackendResult<Vec<Vec<u8>>> {
        Ok(self.state.lock().key_set.iter().cloned().collect())
    }
}
