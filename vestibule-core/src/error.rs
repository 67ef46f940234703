//! Error types for lifecycle, backend, and store operations.

use crate::lifecycle::{LifecycleOp, LifecycleState};
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type for lifecycle transitions.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// Result type for session store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a [`Backend`](crate::backend::Backend) implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection pool error.
    #[error("Pool error: {0}")]
    Pool(String),

    /// I/O failure talking to the underlying store.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key or value could not be encoded/decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Create a connection error.
    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection(err.to_string())
    }

    /// Create a pool error.
    pub fn pool(err: impl std::fmt::Display) -> Self {
        Self::Pool(err.to_string())
    }

    /// Create an I/O error.
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }

    /// Create a configuration error.
    pub fn config(err: impl std::fmt::Display) -> Self {
        Self::Config(err.to_string())
    }

    /// Create an encoding error.
    pub fn encoding(err: impl std::fmt::Display) -> Self {
        Self::Encoding(err.to_string())
    }

    /// Create a generic backend error.
    pub fn other(err: impl std::fmt::Display) -> Self {
        Self::Other(err.to_string())
    }
}

/// Errors raised by the [`LifecycleStateMachine`](crate::lifecycle::LifecycleStateMachine).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The requested transition is not permitted from the current state.
    /// The machine's state is left unchanged.
    #[error("invalid state transition: {state}->{operation}()")]
    InvalidTransition {
        /// State the machine was in when the operation was attempted.
        state: LifecycleState,
        /// Operation that was rejected.
        operation: LifecycleOp,
    },

    /// A lifecycle hook raised an error. The machine has moved to
    /// [`LifecycleState::Failed`] and only accepts `destroy()`.
    #[error("lifecycle {operation}() hook failed: {source}")]
    Hook {
        /// Hook that failed.
        operation: LifecycleOp,
        /// Underlying failure.
        #[source]
        source: BackendError,
    },
}

/// Errors surfaced by [`SessionStore`](crate::store::SessionStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lifecycle transition failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A backend operation failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A facade operation was called while the store is not started.
    #[error("session store is not started")]
    NotStarted,
}
