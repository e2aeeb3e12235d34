//! Read high-water mark

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp at or below which every notification counts as read for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadState {
    pub user_id: String,
    pub last_read_at: DateTime<Utc>,
}

impl ReadState {
    /// Whole-second comparison, matching how creation times are stored
    pub fn covers(&self, created_at: DateTime<Utc>) -> bool {
        created_at.timestamp() <= self.last_read_at.timestamp()
    }
}
