//! Authorization gate
//!
//! A request moves strictly forward through typed states:
//! [`Unauthenticated`] → [`Authenticated`] → [`RoomResolved`] → [`Decision`].
//! A deny short-circuits before storage is touched. Power levels are resolved
//! fresh for every request and shared only between rooms of that request.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::membership::{AccountService, MembershipService, PowerLevelResolver};
use crate::models::{NewNotification, Notification, NotificationView, PowerLevel, ReadState};
use crate::rules::{Action, RuleTable};
use crate::storage::Storage;
use crate::validation::ReferenceValidator;

/// A request carrying only a bearer token
#[derive(Debug, Clone, Copy)]
pub struct Unauthenticated<'t> {
    access_token: &'t str,
}

impl<'t> Unauthenticated<'t> {
    pub fn new(access_token: &'t str) -> Self {
        Self { access_token }
    }

    pub fn authenticate<A: AccountService + ?Sized>(self, accounts: &A) -> Result<Authenticated> {
        if self.access_token.trim().is_empty() {
            return Err(Error::Unauthenticated("Missing access token".into()));
        }
        let user_id = accounts.whoami(self.access_token)?;
        Ok(Authenticated { user_id })
    }
}

/// A request whose caller is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    user_id: String,
}

impl Authenticated {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn resolve_room<M: MembershipService + ?Sized>(
        &self,
        resolver: &mut PowerLevelResolver<'_, M>,
        room_id: &str,
    ) -> Result<RoomResolved> {
        let level = resolver.resolve(&self.user_id, room_id)?;
        Ok(RoomResolved {
            user_id: self.user_id.clone(),
            room_id: room_id.to_string(),
            level,
        })
    }
}

/// A caller with a power level in one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomResolved {
    pub user_id: String,
    pub room_id: String,
    pub level: PowerLevel,
}

impl RoomResolved {
    pub fn decide(self, rules: &RuleTable, action: Action) -> Decision {
        let required = rules.required(action);
        if self.level >= required {
            Decision::Allow(self)
        } else {
            Decision::Deny {
                resolved: self,
                action,
                required,
            }
        }
    }
}

/// Terminal state of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(RoomResolved),
    Deny {
        resolved: RoomResolved,
        action: Action,
        required: PowerLevel,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// Allow passes the resolved caller through; deny becomes [`Error::Unauthorized`]
    pub fn into_result(self) -> Result<RoomResolved> {
        match self {
            Decision::Allow(resolved) => Ok(resolved),
            Decision::Deny {
                resolved,
                action,
                required,
            } => {
                warn!(
                    user_id = %resolved.user_id,
                    room_id = %resolved.room_id,
                    level = resolved.level.value(),
                    required = required.value(),
                    %action,
                    "Request denied"
                );
                Err(Error::Unauthorized(format!(
                    "{} requires power level {}",
                    action, required
                )))
            }
        }
    }
}

/// Orchestrates authentication, power level resolution, rules and storage
pub struct AuthorizationGate<'a, S: Storage + ?Sized, D: MembershipService + AccountService + ?Sized>
{
    rules: RuleTable,
    storage: &'a S,
    directory: &'a D,
    retry_backoff: Option<Duration>,
}

impl<'a, S, D> AuthorizationGate<'a, S, D>
where
    S: Storage + ?Sized,
    D: MembershipService + AccountService + ?Sized,
{
    pub fn new(rules: RuleTable, storage: &'a S, directory: &'a D) -> Self {
        Self {
            rules,
            storage,
            directory,
            retry_backoff: None,
        }
    }

    /// Retry an unreachable membership service once per call
    pub fn with_retry(mut self, backoff: Option<Duration>) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn storage(&self) -> &'a S {
        self.storage
    }

    pub fn directory(&self) -> &'a D {
        self.directory
    }

    /// Fresh resolver for one request
    pub fn resolver(&self) -> PowerLevelResolver<'a, D> {
        PowerLevelResolver::new(self.directory).with_retry(self.retry_backoff)
    }

    pub fn authenticate(&self, access_token: &str) -> Result<Authenticated> {
        Unauthenticated::new(access_token).authenticate(self.directory)
    }

    /// Run a request through to a decision for one room
    pub fn authorize(&self, access_token: &str, room_id: &str, action: Action) -> Result<RoomResolved> {
        let caller = self.authenticate(access_token)?;
        let mut resolver = self.resolver();
        caller
            .resolve_room(&mut resolver, room_id)?
            .decide(&self.rules, action)
            .into_result()
    }

    /// Notifications visible to the caller created at or after `since`
    #[instrument(skip(self, access_token))]
    pub fn list_notifications(
        &self,
        access_token: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<NotificationView>> {
        let caller = self.authenticate(access_token)?;
        let mut resolver = self.resolver();

        let mut levels: HashMap<String, RoomResolved> = HashMap::new();
        for room_id in resolver.joined_rooms(caller.user_id())? {
            match caller.resolve_room(&mut resolver, &room_id) {
                Ok(resolved) => {
                    levels.insert(room_id, resolved);
                }
                // Left the room between the two lookups
                Err(Error::RoomUnknown(room)) => {
                    debug!(%room, "Skipping room");
                }
                Err(e) => return Err(e),
            }
        }

        let rooms: Vec<String> = levels.keys().cloned().collect();
        let read_state = self.storage.get_read_state(caller.user_id())?;

        let views = self
            .storage
            .list_notifications_for_rooms(&rooms, since)?
            .into_iter()
            .filter(|n| {
                levels
                    .get(&n.room_id)
                    .is_some_and(|r| self.rules.permits(r.level, Action::View(n.kind)))
            })
            .map(|notification| {
                let read = read_state
                    .as_ref()
                    .is_some_and(|s| s.covers(notification.created_at));
                NotificationView { notification, read }
            })
            .collect::<Vec<_>>();

        debug!(count = views.len(), rooms = rooms.len(), "Listed notifications");
        Ok(views)
    }

    /// Accept and persist a notification on behalf of the caller
    #[instrument(skip(self, access_token, new), fields(room_id = %new.room_id, kind = %new.kind))]
    pub fn create_notification(
        &self,
        access_token: &str,
        new: NewNotification,
    ) -> Result<Notification> {
        let resolved = self.authorize(access_token, &new.room_id, Action::Create(new.kind))?;

        ReferenceValidator::new(self.storage).validate(&new)?;

        let notification = Notification::accept(new, resolved.user_id, Utc::now());
        self.storage.create_notification(&notification)?;

        info!(id = %notification.id, "Notification created");
        Ok(notification)
    }

    /// Single notification, if the caller may view it
    ///
    /// Anything the caller cannot see reports [`Error::NotFound`].
    #[instrument(skip(self, access_token))]
    pub fn find_notification(&self, access_token: &str, id: &str) -> Result<NotificationView> {
        let caller = self.authenticate(access_token)?;
        let not_found = || Error::NotFound(format!("Notification {}", id));

        let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
        let notification = self.storage.find_notification(id)?.ok_or_else(not_found)?;

        let mut resolver = self.resolver();
        let decision = match caller.resolve_room(&mut resolver, &notification.room_id) {
            Ok(resolved) => resolved.decide(&self.rules, Action::View(notification.kind)),
            Err(Error::RoomUnknown(_)) => return Err(not_found()),
            Err(e) => return Err(e),
        };
        if !decision.is_allowed() {
            return Err(not_found());
        }

        let read = self
            .storage
            .get_read_state(caller.user_id())?
            .is_some_and(|s| s.covers(notification.created_at));
        Ok(NotificationView { notification, read })
    }

    /// Advance the caller's read mark to `now`
    #[instrument(skip(self, access_token))]
    pub fn mark_read(&self, access_token: &str, now: DateTime<Utc>) -> Result<ReadState> {
        let caller = self.authenticate(access_token)?;
        self.storage.mark_read(caller.user_id(), now)
    }
}
