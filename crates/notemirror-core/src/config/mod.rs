//! Sync engine configuration.

use std::time::Duration;

const DEFAULT_INDEX_COOLDOWN_MS: u64 = 2_000;

/// Settings handed to [`crate::sync::SyncEngine`] at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Log every per-note decision at info level instead of debug.
    pub verbose: bool,
    /// Minimum gap between a remote write and the next index listing.
    ///
    /// The store may serve a stale index when it is listed right after an
    /// update, so the engine waits out the remainder of this window.
    pub index_cooldown: Duration,
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn with_index_cooldown(mut self, cooldown: Duration) -> Self {
        self.index_cooldown = cooldown;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            index_cooldown: Duration::from_millis(DEFAULT_INDEX_COOLDOWN_MS),
        }
    }
}
