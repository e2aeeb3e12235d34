//! Power level model

use serde::{Deserialize, Serialize};

/// Authorization rank of a user within a room (higher = more privileged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerLevel(pub i64);

impl PowerLevel {
    /// Plain member, also the fallback when a room records nothing
    pub const MEMBER: PowerLevel = PowerLevel(0);
    pub const MODERATOR: PowerLevel = PowerLevel(50);
    /// Owner
    pub const ADMIN: PowerLevel = PowerLevel(100);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn display_name(&self) -> &'static str {
        match *self {
            l if l >= PowerLevel::ADMIN => "Admin",
            l if l >= PowerLevel::MODERATOR => "Moderator",
            _ => "Member",
        }
    }
}

impl Default for PowerLevel {
    fn default() -> Self {
        PowerLevel::MEMBER
    }
}

impl From<i64> for PowerLevel {
    fn from(value: i64) -> Self {
        PowerLevel(value)
    }
}

impl std::fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.0)
    }
}
