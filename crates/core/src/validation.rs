//! Reference integrity between paired notification types
//!
//! Answers point at questions and votes point at polls. Every way a reference
//! can be wrong except an absent id reports [`Error::ReferenceNotFound`], so a
//! caller cannot probe which notifications exist in other rooms.

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::NewNotification;
use crate::storage::NotificationRepository;

pub struct ReferenceValidator<'a, S: NotificationRepository + ?Sized> {
    storage: &'a S,
}

impl<'a, S: NotificationRepository + ?Sized> ReferenceValidator<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn validate(&self, candidate: &NewNotification) -> Result<()> {
        let Some(expected) = candidate.kind.referenced_type() else {
            return Ok(());
        };

        let reference = candidate
            .content
            .reference()
            .ok_or(Error::MissingReference)?;

        let Ok(id) = Uuid::parse_str(reference.trim()) else {
            debug!(reference, "Reference is not a notification id");
            return Err(Error::ReferenceNotFound);
        };

        let referenced = self
            .storage
            .find_notification(id)?
            .ok_or(Error::ReferenceNotFound)?;

        if referenced.room_id != candidate.room_id {
            debug!(%id, "Reference points into another room");
            return Err(Error::ReferenceNotFound);
        }

        if referenced.kind != expected {
            debug!(%id, found = %referenced.kind, %expected, "Reference type mismatch");
            return Err(Error::ReferenceNotFound);
        }

        Ok(())
    }
}
