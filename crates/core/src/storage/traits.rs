//! Storage repository traits
//!
//! These traits define the storage interface the authorization gate and
//! services work against, allowing for different implementations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{InviteCapability, Notification, Organization, ReadState};

/// Organization repository operations
pub trait OrganizationRepository {
    /// Create a new organization
    fn create_organization(&self, org: &Organization) -> Result<()>;

    /// Find organization by room ID
    fn find_organization(&self, room_id: &str) -> Result<Option<Organization>>;

    /// List all organizations
    fn list_organizations(&self) -> Result<Vec<Organization>>;
}

/// Notification repository operations
pub trait NotificationRepository {
    /// Persist an accepted notification
    fn create_notification(&self, notification: &Notification) -> Result<()>;

    /// Find notification by ID
    fn find_notification(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Notifications in the given rooms created at or after `since`
    fn list_notifications_for_rooms(
        &self,
        rooms: &[String],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>>;
}

/// Read state repository operations
pub trait ReadStateRepository {
    /// Current read mark of a user
    fn get_read_state(&self, user_id: &str) -> Result<Option<ReadState>>;

    /// Raise a user's read mark, never lowering it
    fn mark_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<ReadState>;
}

/// Invite repository operations
pub trait InviteRepository {
    /// Create a new invite
    fn create_invite(&self, invite: &InviteCapability) -> Result<()>;

    /// Find invite by token
    fn find_invite(&self, hash: &str) -> Result<Option<InviteCapability>>;

    /// List invites for an organization
    fn list_invites_for_room(&self, room_id: &str) -> Result<Vec<InviteCapability>>;

    /// Bind a user to a pending invite; false if none was pending
    fn attach_invite_user(&self, hash: &str, user_id: &str) -> Result<bool>;

    fn reassign_invite_user(&self, hash: &str, from: &str, to: &str) -> Result<()>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
pub trait Storage:
    OrganizationRepository + NotificationRepository + ReadStateRepository + InviteRepository
{
}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: OrganizationRepository + NotificationRepository + ReadStateRepository + InviteRepository
{
}
