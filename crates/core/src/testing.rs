//! In-memory stand-ins for the external services, used by tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mail::{InviteEmail, Mailer};
use crate::membership::{AccountService, MembershipService, Registration, RoomPowerLevels};
use crate::models::PowerLevel;

/// Fake membership directory and account server
#[derive(Default)]
pub struct FakeDirectory {
    joined: HashMap<String, Vec<String>>,
    levels: HashMap<String, RoomPowerLevels>,
    tokens: HashMap<String, String>,
    emails: HashMap<String, String>,
    registered: RefCell<Vec<String>>,
    calls: Cell<usize>,
    failures: Cell<usize>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a user in a room with an explicit level
    pub fn join(mut self, user_id: &str, room_id: &str, level: PowerLevel) -> Self {
        self.joined
            .entry(user_id.to_string())
            .or_default()
            .push(room_id.to_string());
        let levels = self.levels.remove(room_id).unwrap_or_default();
        self.levels
            .insert(room_id.to_string(), levels.with_user(user_id, level));
        self
    }

    /// Access token for a user, with an optional verified email
    pub fn token(mut self, token: &str, user_id: &str, email: Option<&str>) -> Self {
        self.tokens.insert(token.to_string(), user_id.to_string());
        if let Some(email) = email {
            self.emails.insert(token.to_string(), email.to_string());
        }
        self
    }

    /// Fail the next `count` membership calls as unreachable
    pub fn failing(self, count: usize) -> Self {
        self.failures.set(count);
        self
    }

    /// Membership calls answered so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn registered(&self) -> Vec<String> {
        self.registered.borrow().clone()
    }

    fn record_call(&self) -> Result<()> {
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(Error::UpstreamUnavailable("connection refused".into()));
        }
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

impl MembershipService for FakeDirectory {
    fn joined_rooms(&self, user_id: &str) -> Result<Vec<String>> {
        self.record_call()?;
        Ok(self.joined.get(user_id).cloned().unwrap_or_default())
    }

    fn room_power_levels(&self, room_id: &str) -> Result<RoomPowerLevels> {
        self.record_call()?;
        self.levels
            .get(room_id)
            .cloned()
            .ok_or_else(|| Error::RoomUnknown(room_id.to_string()))
    }
}

impl AccountService for FakeDirectory {
    fn whoami(&self, access_token: &str) -> Result<String> {
        self.tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| Error::Unauthenticated("Unknown access token".into()))
    }

    fn email(&self, access_token: &str) -> Result<Option<String>> {
        self.whoami(access_token)?;
        Ok(self.emails.get(access_token).cloned())
    }

    fn register(&self, username: &str, _password: &str) -> Result<Registration> {
        let user_id = format!("@{}:test", username);
        if self.registered.borrow().contains(&user_id) {
            return Err(Error::Registration("M_USER_IN_USE".into()));
        }
        self.registered.borrow_mut().push(user_id.clone());
        Ok(Registration {
            user_id,
            access_token: Some(format!("token-{}", username)),
            device_id: None,
        })
    }
}

/// Mailer that keeps every message, optionally refusing to send
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: RefCell<Vec<(String, InviteEmail)>>,
    pub fail: bool,
}

impl Mailer for RecordingMailer {
    fn send(&self, to: &str, email: &InviteEmail) -> Result<()> {
        if self.fail {
            return Err(Error::unknown("smtp: connection refused"));
        }
        self.sent.borrow_mut().push((to.to_string(), email.clone()));
        Ok(())
    }
}
