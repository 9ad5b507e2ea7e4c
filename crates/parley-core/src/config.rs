use chrono::Duration;

/// Default window in which a user counts as online after their last action.
pub const DEFAULT_ONLINE_THRESHOLD_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// `now - last_seen` must be strictly below this for `online = true`.
    pub online_threshold: Duration,
    /// Reject group messages from non-members. Turning this off accepts
    /// messages from any authenticated user.
    pub require_group_membership: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            online_threshold: Duration::seconds(DEFAULT_ONLINE_THRESHOLD_SECS),
            require_group_membership: true,
        }
    }
}
