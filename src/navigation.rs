// Navigation watcher module
// Detects client-side route changes that never reload the document

/// Fallback poll period for hosts whose navigation events are unreliable,
/// in milliseconds
pub const NAV_POLL_INTERVAL_MS: u32 = 1000;

/// Delay before re-scanning after a route change, allowing the new page's
/// DOM to finish mounting, in milliseconds
pub const SETTLE_DELAY_MS: u32 = 100;

/// Tracks the last observed location path.
///
/// Route changes in a single-page application arrive over several signals
/// of differing reliability (history-mutation interception, the
/// back/forward event, the fallback poll); this deduplicates them so each
/// actual change is reported exactly once no matter how many signals fire.
#[derive(Debug, Clone, Default)]
pub struct NavigationWatcher {
    last_path: String,
}

impl NavigationWatcher {
    /// Start tracking from the given path.
    pub fn new(initial_path: String) -> Self {
        Self {
            last_path: initial_path,
        }
    }

    /// Record the currently observed path. Returns true exactly when it
    /// differs from the last observed one.
    pub fn observe(&mut self, current_path: String) -> bool {
        if current_path == self.last_path {
            return false;
        }
        self.last_path = current_path;
        true
    }

    /// The last observed path.
    pub fn last_path(&self) -> &str {
        &self.last_path
    }
}
