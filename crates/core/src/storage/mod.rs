//! SQLite storage layer for the notifier

mod invites;
mod migrations;
mod notifications;
mod organizations;
mod parse;
mod read_state;
mod traits;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{InviteCapability, Notification, Organization, ReadState};

pub use invites::InviteStore;
pub use notifications::NotificationStore;
pub use organizations::OrganizationStore;
pub use read_state::ReadStateStore;
pub use traits::{
    InviteRepository, NotificationRepository, OrganizationRepository, ReadStateRepository,
    Storage,
};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        migrations::get_current_version(&self.conn)
    }

    /// Run `f` inside a transaction, committing only if it succeeds
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Get organization store
    pub fn organizations(&self) -> OrganizationStore<'_> {
        OrganizationStore::new(&self.conn)
    }

    /// Get notification store
    pub fn notifications(&self) -> NotificationStore<'_> {
        NotificationStore::new(&self.conn)
    }

    /// Get read state store
    pub fn read_state(&self) -> ReadStateStore<'_> {
        ReadStateStore::new(&self.conn)
    }

    /// Get invite store
    pub fn invites(&self) -> InviteStore<'_> {
        InviteStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl OrganizationRepository for Database {
    fn create_organization(&self, org: &Organization) -> Result<()> {
        self.organizations().create(org)
    }

    fn find_organization(&self, room_id: &str) -> Result<Option<Organization>> {
        self.organizations().find_by_id(room_id)
    }

    fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.organizations().list()
    }
}

impl NotificationRepository for Database {
    fn create_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications().create(notification)
    }

    fn find_notification(&self, id: Uuid) -> Result<Option<Notification>> {
        self.notifications().find_by_id(id)
    }

    fn list_notifications_for_rooms(
        &self,
        rooms: &[String],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>> {
        self.notifications().list_for_rooms(rooms, since)
    }
}

impl ReadStateRepository for Database {
    fn get_read_state(&self, user_id: &str) -> Result<Option<ReadState>> {
        self.read_state().get(user_id)
    }

    fn mark_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<ReadState> {
        self.read_state().mark_read(user_id, at)
    }
}

impl InviteRepository for Database {
    fn create_invite(&self, invite: &InviteCapability) -> Result<()> {
        self.invites().create(invite)
    }

    fn find_invite(&self, hash: &str) -> Result<Option<InviteCapability>> {
        self.invites().find_by_hash(hash)
    }

    fn list_invites_for_room(&self, room_id: &str) -> Result<Vec<InviteCapability>> {
        self.invites().list_for_room(room_id)
    }

    fn attach_invite_user(&self, hash: &str, user_id: &str) -> Result<bool> {
        self.invites().attach_user(hash, user_id)
    }

    fn reassign_invite_user(&self, hash: &str, from: &str, to: &str) -> Result<()> {
        self.invites().reassign_user(hash, from, to)
    }
}
