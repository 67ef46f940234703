//! Session store configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`SessionStore`](crate::store::SessionStore).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Wrap the backend in a [`BackendSpy`](crate::spy::BackendSpy) that
    /// times every operation.
    #[serde(default)]
    pub spy_enabled: bool,
    /// Register a post-request flush hook with the host pipeline on start.
    #[serde(default)]
    pub flush_hook_enabled: bool,
}

impl StoreConfig {
    /// Create a configuration with both features disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the instrumentation spy.
    pub fn with_spy(mut self, enabled: bool) -> Self {
        self.spy_enabled = enabled;
        self
    }

    /// Enable or disable flush hook registration.
    pub fn with_flush_hook(mut self, enabled: bool) -> Self {
        self.flush_hook_enabled = enabled;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Recognizes `VESTIBULE_SPY` and `VESTIBULE_FLUSH_HOOK`; any value
    /// other than `0`/`false` enables the feature.
    pub fn from_env() -> Self {
        fn flag(name: &str) -> bool {
            std::env::var(name)
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(false)
        }

        Self {
            spy_enabled: flag("VESTIBULE_SPY"),
            flush_hook_enabled: flag("VESTIBULE_FLUSH_HOOK"),
        }
    }
}
