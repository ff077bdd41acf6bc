//! Configuration for the sync engine.

use std::time::Duration;

/// Default conflict window: timestamp gaps below this are treated as one
/// edit, absorbing clock and network jitter.
pub const DEFAULT_CONFLICT_WINDOW_MS: i64 = 1_000;

/// Default display window before a terminal drain status reverts to idle.
pub const DEFAULT_DISPLAY_WINDOW: Duration = Duration::from_secs(3);

/// Configuration for a sync engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Owning scope: the facility / tenant whose records this device
    /// holds. Remote fetches are filtered to this scope.
    pub facility_id: String,
    /// Actor stamped on mutations made through this device.
    pub device_actor: String,
    /// Conflict detection window in milliseconds.
    pub conflict_window_ms: i64,
    /// How long a terminal Success/Error status stays visible before
    /// reverting to idle.
    pub status_display_window: Duration,
}

impl EngineConfig {
    /// Creates a configuration for one facility and device actor.
    pub fn new(facility_id: impl Into<String>, device_actor: impl Into<String>) -> Self {
        Self {
            facility_id: facility_id.into(),
            device_actor: device_actor.into(),
            conflict_window_ms: DEFAULT_CONFLICT_WINDOW_MS,
            status_display_window: DEFAULT_DISPLAY_WINDOW,
        }
    }

    /// Sets the conflict detection window.
    ///
    /// Deployments with poorly synchronized device clocks can widen this
    /// at the cost of more near-simultaneous edits collapsing to one.
    pub fn with_conflict_window_ms(mut self, window_ms: i64) -> Self {
        self.conflict_window_ms = window_ms;
        self
    }

    /// Sets the terminal-status display window.
    pub fn with_status_display_window(mut self, window: Duration) -> Self {
        self.status_display_window = window;
        self
    }
}
