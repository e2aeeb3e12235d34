//! Membership service seam and power level resolution
//!
//! Room membership and power levels live in the external chat service. The
//! engine only consults it; nothing here is persisted. A resolver is built per
//! request so levels are re-read for every authorization decision and reused
//! only within that request.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::models::PowerLevel;

/// Power level configuration of a single room
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPowerLevels {
    /// Per-user overrides
    #[serde(default)]
    pub users: HashMap<String, i64>,
    /// Room default for users without an override
    #[serde(default)]
    pub users_default: Option<i64>,
}

impl RoomPowerLevels {
    pub fn with_user(mut self, user_id: impl Into<String>, level: PowerLevel) -> Self {
        self.users.insert(user_id.into(), level.value());
        self
    }

    pub fn with_default(mut self, level: PowerLevel) -> Self {
        self.users_default = Some(level.value());
        self
    }

    /// User override, else room default, else the lowest level
    pub fn level_for(&self, user_id: &str) -> PowerLevel {
        self.users
            .get(user_id)
            .copied()
            .or(self.users_default)
            .map(PowerLevel)
            .unwrap_or(PowerLevel::MEMBER)
    }
}

/// Room membership queries against the external service
pub trait MembershipService {
    /// Rooms the user has joined
    fn joined_rooms(&self, user_id: &str) -> Result<Vec<String>>;

    /// Power level configuration of a room
    fn room_power_levels(&self, room_id: &str) -> Result<RoomPowerLevels>;
}

/// Result of registering a new account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Account operations against the external service
pub trait AccountService {
    /// Resolve the user owning an access token
    fn whoami(&self, access_token: &str) -> Result<String>;

    /// Verified email address of the token's owner, if any
    fn email(&self, access_token: &str) -> Result<Option<String>>;

    /// Register a new account
    fn register(&self, username: &str, password: &str) -> Result<Registration>;
}

/// Per-request power level resolver
pub struct PowerLevelResolver<'a, M: MembershipService + ?Sized> {
    service: &'a M,
    retry_backoff: Option<Duration>,
    joined: HashMap<String, Vec<String>>,
    levels: HashMap<String, RoomPowerLevels>,
}

impl<'a, M: MembershipService + ?Sized> PowerLevelResolver<'a, M> {
    pub fn new(service: &'a M) -> Self {
        Self {
            service,
            retry_backoff: None,
            joined: HashMap::new(),
            levels: HashMap::new(),
        }
    }

    /// Retry an unreachable service once after the given delay
    pub fn with_retry(mut self, backoff: Option<Duration>) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Rooms the user belongs to
    #[instrument(skip(self))]
    pub fn joined_rooms(&mut self, user_id: &str) -> Result<Vec<String>> {
        if let Some(rooms) = self.joined.get(user_id) {
            return Ok(rooms.clone());
        }

        let service = self.service;
        let rooms = self.call(|| service.joined_rooms(user_id))?;
        self.joined.insert(user_id.to_string(), rooms.clone());
        Ok(rooms)
    }

    /// Effective power level of a user in a room
    #[instrument(skip(self))]
    pub fn resolve(&mut self, user_id: &str, room_id: &str) -> Result<PowerLevel> {
        if !self.joined_rooms(user_id)?.iter().any(|r| r == room_id) {
            return Err(Error::RoomUnknown(room_id.to_string()));
        }

        if !self.levels.contains_key(room_id) {
            let service = self.service;
            let levels = self.call(|| service.room_power_levels(room_id))?;
            self.levels.insert(room_id.to_string(), levels);
        }

        let level = self
            .levels
            .get(room_id)
            .map(|levels| levels.level_for(user_id))
            .unwrap_or_default();

        debug!(level = level.value(), "Resolved power level");
        Ok(level)
    }

    fn call<T>(&self, f: impl Fn() -> Result<T>) -> Result<T> {
        match f() {
            Err(Error::UpstreamUnavailable(reason)) => match self.retry_backoff {
                Some(backoff) => {
                    warn!(%reason, ?backoff, "Membership service unavailable, retrying once");
                    thread::sleep(backoff);
                    f()
                }
                None => Err(Error::UpstreamUnavailable(reason)),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;

    #[test]
    fn test_level_precedence() {
        let levels = RoomPowerLevels::default()
            .with_user("@mod:x", PowerLevel::MODERATOR)
            .with_default(PowerLevel(10));
        assert_eq!(levels.level_for("@mod:x"), PowerLevel::MODERATOR);
        assert_eq!(levels.level_for("@other:x"), PowerLevel(10));

        let bare = RoomPowerLevels::default();
        assert_eq!(bare.level_for("@other:x"), PowerLevel::MEMBER);
    }

    #[test]
    fn test_power_levels_json() {
        let levels: RoomPowerLevels = serde_json::from_str(
            r#"{"users":{"@a:x":100},"users_default":5,"events_default":0}"#,
        )
        .unwrap();
        assert_eq!(levels.level_for("@a:x"), PowerLevel::ADMIN);
        assert_eq!(levels.level_for("@b:x"), PowerLevel(5));
    }

    #[test]
    fn test_resolve_member_room() {
        let directory = FakeDirectory::new().join("@alice:x", "!r1:x", PowerLevel::MODERATOR);
        let mut resolver = PowerLevelResolver::new(&directory);
        assert_eq!(
            resolver.resolve("@alice:x", "!r1:x").unwrap(),
            PowerLevel::MODERATOR
        );
    }

    #[test]
    fn test_resolve_unknown_room() {
        let directory = FakeDirectory::new()
            .join("@alice:x", "!r1:x", PowerLevel::ADMIN)
            .join("@bob:x", "!r2:x", PowerLevel::ADMIN);
        let mut resolver = PowerLevelResolver::new(&directory);
        assert!(matches!(
            resolver.resolve("@alice:x", "!r2:x"),
            Err(Error::RoomUnknown(_))
        ));
    }

    #[test]
    fn test_resolve_caches_within_request() {
        let directory = FakeDirectory::new().join("@alice:x", "!r1:x", PowerLevel::MEMBER);
        let mut resolver = PowerLevelResolver::new(&directory);
        resolver.resolve("@alice:x", "!r1:x").unwrap();
        resolver.resolve("@alice:x", "!r1:x").unwrap();
        assert_eq!(directory.calls(), 2);

        // A fresh resolver asks again
        let mut next = PowerLevelResolver::new(&directory);
        next.resolve("@alice:x", "!r1:x").unwrap();
        assert_eq!(directory.calls(), 4);
    }

    #[test]
    fn test_upstream_failure_surfaces_without_retry() {
        let directory = FakeDirectory::new()
            .join("@alice:x", "!r1:x", PowerLevel::MEMBER)
            .failing(1);
        let mut resolver = PowerLevelResolver::new(&directory);
        assert!(matches!(
            resolver.resolve("@alice:x", "!r1:x"),
            Err(Error::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn test_upstream_failure_retried_once() {
        let directory = FakeDirectory::new()
            .join("@alice:x", "!r1:x", PowerLevel::ADMIN)
            .failing(1);
        let mut resolver =
            PowerLevelResolver::new(&directory).with_retry(Some(Duration::from_millis(1)));
        assert_eq!(
            resolver.resolve("@alice:x", "!r1:x").unwrap(),
            PowerLevel::ADMIN
        );
    }
}
