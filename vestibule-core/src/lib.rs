//! # Vestibule Core
//!
//! A pluggable persistence layer for short-lived session state, wrapped in a
//! formally-governed lifecycle.
//!
//! ## Components
//!
//! - [`LifecycleStateMachine`]: finite-state controller sequencing
//!   `init -> start -> stop -> destroy` for anything implementing the
//!   four-hook [`LifecycleContext`] capability, with illegal transitions
//!   rejected loudly and hook failures quarantined in a `FAILED` state.
//! - [`Backend`]: the key/value storage contract, lifecycle hooks plus
//!   atomic `put`/`remove` against an auxiliary key-set.
//! - [`BackendSpy`]: transparent decorator timing every backend call.
//! - [`MemoryBackend`]: in-process reference backend.
//! - [`SessionStore`]: owns a backend, drives it through the state machine,
//!   and exposes `save`/`load`/`remove`/`clear`/`keys`/`size` behind a
//!   reader/writer lock so request traffic never overlaps a lifecycle
//!   transition.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vestibule_core::{Backend, MemoryBackend, SessionStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vestibule_core::StoreError> {
//!     let store = SessionStore::new(
//!         StoreConfig::new().with_spy(true),
//!         Arc::new(|| Ok(Box::new(MemoryBackend::new()) as Box<dyn Backend>)),
//!     );
//!
//!     store.start().await?;
//!     store.save("abc", &[0x01, 0x02]).await?;
//!     assert_eq!(store.size().await?, 1);
//!     store.stop().await?;
//!     store.destroy().await?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod backend;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod spy;
pub mod store;

pub use adapter::{FlushRegistration, HostAdapter, NoopHostAdapter};
pub use backend::Backend;
pub use config::StoreConfig;
pub use error::{BackendError, BackendResult, LifecycleError, LifecycleResult, StoreError, StoreResult};
pub use lifecycle::{
    LifecycleContext, LifecycleListener, LifecycleOp, LifecycleState, LifecycleStateMachine,
};
pub use memory::MemoryBackend;
pub use spy::BackendSpy;
pub use store::{BackendFactory, SessionStore};

/// Re-export of commonly used types.
pub mod prelude {
    pub use crate::adapter::{FlushRegistration, HostAdapter, NoopHostAdapter};
    pub use crate::backend::Backend;
    pub use crate::config::StoreConfig;
    pub use crate::error::{BackendError, LifecycleError, StoreError};
    pub use crate::lifecycle::{LifecycleContext, LifecycleState, LifecycleStateMachine};
    pub use crate::memory::MemoryBackend;
    pub use crate::spy::BackendSpy;
    pub use crate::store::{BackendFactory, SessionStore};
}
