//! Invite capability model

use serde::{Deserialize, Serialize};

use super::PowerLevel;

/// A pending or consumed invitation into an organization.
///
/// Keyed by the capability token itself; no other secret is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCapability {
    pub hash: String,
    pub room_id: String,
    pub level: PowerLevel,
    /// Set once the invitee completes registration
    pub user_id: Option<String>,
}

impl InviteCapability {
    pub fn new(hash: String, room_id: impl Into<String>, level: PowerLevel) -> Self {
        Self {
            hash,
            room_id: room_id.into(),
            level,
            user_id: None,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.user_id.is_some()
    }
}
