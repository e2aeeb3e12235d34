//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{Content, NotificationType, PowerLevel};

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Timestamps are stored as whole unix seconds
pub fn datetime_from_secs(secs: i64) -> Result<DateTime<Utc>, SqlError> {
    DateTime::from_timestamp(secs, 0).ok_or(SqlError::IntegralValueOutOfRange(0, secs))
}

/// Parse a notification type from its canonical name
pub fn parse_kind(s: &str) -> Result<NotificationType, SqlError> {
    s.parse().map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse the JSON content column
pub fn parse_content(s: &str) -> Result<Content, SqlError> {
    serde_json::from_str(s).map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn level_from_i64(value: i64) -> PowerLevel {
    PowerLevel(value)
}

/// Whether an insert failed on a primary key or UNIQUE constraint
pub fn is_unique_violation(err: &SqlError) -> bool {
    match err {
        SqlError::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
