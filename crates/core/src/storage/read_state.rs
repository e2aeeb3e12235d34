//! Read high-water mark storage

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::parse::{datetime_from_secs, OptionalExt};
use crate::error::{Error, Result};
use crate::models::ReadState;

pub struct ReadStateStore<'a> {
    conn: &'a Connection,
}

impl<'a> ReadStateStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Current mark for a user, if one was ever set
    pub fn get(&self, user_id: &str) -> Result<Option<ReadState>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, last_read_at FROM read_state WHERE user_id = ?1")?;

        let state = stmt
            .query_row(params![user_id], |row| {
                Ok(ReadState {
                    user_id: row.get(0)?,
                    last_read_at: datetime_from_secs(row.get(1)?)?,
                })
            })
            .optional()?;

        Ok(state)
    }

    /// Raise the mark to `at`; an older `at` leaves it unchanged
    pub fn mark_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<ReadState> {
        self.conn.execute(
            "INSERT INTO read_state (user_id, last_read_at) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE
             SET last_read_at = MAX(last_read_at, excluded.last_read_at)",
            params![user_id, at.timestamp()],
        )?;

        self.get(user_id)?
            .ok_or_else(|| Error::unknown(format!("read state for {} vanished", user_id)))
    }
}
