use std::time::Duration;

use crate::retry::RetryPolicy;

/// Timing and sizing of the calendar connection flow.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub popup_width: u32,
    pub popup_height: u32,
    /// How often the popup is checked for having been closed by the user.
    pub poll_interval: Duration,
    /// Pause between a successful code exchange and the post-success hook.
    pub settle_delay: Duration,
    /// How long a processed authorization code keeps blocking duplicates.
    pub duplicate_grace: Duration,
    pub callback_retry: RetryPolicy,
    /// Origin accepted for cross-context auth messages.
    pub app_origin: String,
}

impl SyncConfig {
    pub fn new(app_origin: impl Into<String>) -> Self {
        SyncConfig {
            popup_width: 600,
            popup_height: 600,
            poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_millis(500),
            duplicate_grace: Duration::from_secs(5),
            callback_retry: RetryPolicy::new(3, Duration::from_secs(1)),
            app_origin: app_origin.into(),
        }
    }
}
