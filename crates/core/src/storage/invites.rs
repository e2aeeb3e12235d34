//! Invite storage operations

use rusqlite::{params, Connection, Row};

use super::parse::{is_unique_violation, level_from_i64, OptionalExt};
use crate::error::{Error, Result};
use crate::models::InviteCapability;

pub struct InviteStore<'a> {
    conn: &'a Connection,
}

fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<InviteCapability> {
    Ok(InviteCapability {
        hash: row.get(0)?,
        room_id: row.get(1)?,
        level: level_from_i64(row.get(2)?),
        user_id: row.get(3)?,
    })
}

impl<'a> InviteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new invite
    ///
    /// A second invite with the same token fails with [`Error::AlreadyInvited`].
    pub fn create(&self, invite: &InviteCapability) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO invites (hash, room_id, level, user_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                invite.hash,
                invite.room_id,
                invite.level.value(),
                invite.user_id,
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyInvited),
            Err(e) => Err(e.into()),
        }
    }

    /// Find invite by token
    pub fn find_by_hash(&self, hash: &str) -> Result<Option<InviteCapability>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hash, room_id, level, user_id FROM invites WHERE hash = ?1")?;

        let invite = stmt.query_row(params![hash], invite_from_row).optional()?;

        Ok(invite)
    }

    /// List invites for an organization
    pub fn list_for_room(&self, room_id: &str) -> Result<Vec<InviteCapability>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash, room_id, level, user_id FROM invites WHERE room_id = ?1 ORDER BY hash",
        )?;

        let invites = stmt
            .query_map(params![room_id], invite_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(invites)
    }

    /// Bind the registered user to a pending invite.
    ///
    /// Returns false if the invite does not exist or is already consumed.
    pub fn attach_user(&self, hash: &str, user_id: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE invites SET user_id = ?2 WHERE hash = ?1 AND user_id IS NULL",
            params![hash, user_id],
        )?;
        Ok(updated == 1)
    }

    /// Hand a claimed invite from a provisional holder to the final user
    pub fn reassign_user(&self, hash: &str, from: &str, to: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE invites SET user_id = ?3 WHERE hash = ?1 AND user_id = ?2",
            params![hash, from, to],
        )?;
        Ok(())
    }
}
