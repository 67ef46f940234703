// Vestibule - a lifecycle-governed session store for Rust
//
// This library wires a pluggable key/value backend behind a strict
// lifecycle state machine and a locking store facade, with Redis
// single-node and cluster backends available behind features.

// Re-export core functionality
pub use vestibule_core::*;

// Re-export optional crates
#[cfg(feature = "redis")]
pub use vestibule_redis;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Backend,
        BackendError,
        BackendFactory,
        BackendResult,
        BackendSpy,
        HostAdapter,
        LifecycleError,
        LifecycleState,
        MemoryBackend,
        SessionStore,
        StoreConfig,
        StoreError,
        StoreResult,
    };

    #[cfg(feature = "redis")]
    pub use vestibule_redis::{RedisBackend, RedisBackendFactory, RedisConfig};
}
