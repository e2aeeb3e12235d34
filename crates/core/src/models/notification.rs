//! Notification model

use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Kind of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Distress signal from any member
    Panic,
    /// Admin-to-admin message
    Broadcast,
    Announcement,
    Question,
    /// Reply to a question
    Answer,
    Poll,
    /// Reply to a poll
    Vote,
}

impl NotificationType {
    pub const ALL: [NotificationType; 7] = [
        NotificationType::Panic,
        NotificationType::Broadcast,
        NotificationType::Announcement,
        NotificationType::Question,
        NotificationType::Answer,
        NotificationType::Poll,
        NotificationType::Vote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Panic => "panic",
            NotificationType::Broadcast => "broadcast",
            NotificationType::Announcement => "announcement",
            NotificationType::Question => "question",
            NotificationType::Answer => "answer",
            NotificationType::Poll => "poll",
            NotificationType::Vote => "vote",
        }
    }

    /// The type a notification of this kind must reference, if any
    pub fn referenced_type(&self) -> Option<NotificationType> {
        match self {
            NotificationType::Answer => Some(NotificationType::Question),
            NotificationType::Vote => Some(NotificationType::Poll),
            NotificationType::Panic
            | NotificationType::Broadcast
            | NotificationType::Announcement
            | NotificationType::Question
            | NotificationType::Poll => None,
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Invalid(format!("unknown notification type '{}'", s)))
    }
}

/// A labelled option of a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// Structured payload of a notification, stored as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub text: String,
    /// Client-side grouping key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(default, alias = "ref_id", skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, id: impl Into<String>) -> Self {
        self.reference_id = Some(id.into());
        self
    }

    pub fn with_collapse_key(mut self, key: impl Into<String>) -> Self {
        self.collapse_key = Some(key.into());
        self
    }

    pub fn with_choice(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.choices.push(Choice {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    /// Non-empty reference id, if any
    pub fn reference(&self) -> Option<&str> {
        self.reference_id.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// A notification as submitted by a client, before acceptance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    #[serde(rename = "destination")]
    pub room_id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub content: Content,
}

impl NewNotification {
    pub fn new(room_id: impl Into<String>, kind: NotificationType, content: Content) -> Self {
        Self {
            room_id: room_id.into(),
            priority: 0,
            kind,
            content,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A persisted notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub room_id: String,
    /// Author
    pub user_id: String,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub content: Content,
}

impl Notification {
    /// Accept a submission: the id and creation time are assigned here,
    /// never taken from the client.
    pub fn accept(new: NewNotification, author: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            room_id: new.room_id,
            user_id: author.into(),
            priority: new.priority,
            created_at: now.trunc_subsecs(0),
            kind: new.kind,
            content: new.content,
        }
    }
}

/// A notification annotated with the viewer's read state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub read: bool,
}
