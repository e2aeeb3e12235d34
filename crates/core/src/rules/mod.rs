//! Rule table for notification and organization operations
//!
//! Viewing and creating a notification type are gated independently: an
//! announcement is created by moderators but read by every member, while a
//! vote is cast by members and only tallied by moderators.

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{NotificationType, PowerLevel};

/// Operations gated by a power level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View(NotificationType),
    Create(NotificationType),
    Invite,
    CreateOrganization,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::View(kind) => write!(f, "view {}", kind),
            Action::Create(kind) => write!(f, "create {}", kind),
            Action::Invite => write!(f, "invite"),
            Action::CreateOrganization => write!(f, "create organization"),
        }
    }
}

/// Minimum power level per notification type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub panic: PowerLevel,
    pub broadcast: PowerLevel,
    pub announcement: PowerLevel,
    pub question: PowerLevel,
    pub answer: PowerLevel,
    pub poll: PowerLevel,
    pub vote: PowerLevel,
}

impl Thresholds {
    pub fn default_view() -> Self {
        Self {
            panic: PowerLevel::MEMBER,
            broadcast: PowerLevel::ADMIN,
            announcement: PowerLevel::MEMBER,
            question: PowerLevel::MEMBER,
            answer: PowerLevel::MEMBER,
            poll: PowerLevel::MEMBER,
            vote: PowerLevel::MODERATOR,
        }
    }

    pub fn default_create() -> Self {
        Self {
            panic: PowerLevel::MEMBER,
            broadcast: PowerLevel::ADMIN,
            announcement: PowerLevel::MODERATOR,
            question: PowerLevel::MODERATOR,
            answer: PowerLevel::MEMBER,
            poll: PowerLevel::MODERATOR,
            vote: PowerLevel::MEMBER,
        }
    }

    pub fn get(&self, kind: NotificationType) -> PowerLevel {
        match kind {
            NotificationType::Panic => self.panic,
            NotificationType::Broadcast => self.broadcast,
            NotificationType::Announcement => self.announcement,
            NotificationType::Question => self.question,
            NotificationType::Answer => self.answer,
            NotificationType::Poll => self.poll,
            NotificationType::Vote => self.vote,
        }
    }
}

/// Per-type overrides read from config; unset types keep their default
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdOverrides {
    panic: Option<PowerLevel>,
    broadcast: Option<PowerLevel>,
    announcement: Option<PowerLevel>,
    question: Option<PowerLevel>,
    answer: Option<PowerLevel>,
    poll: Option<PowerLevel>,
    vote: Option<PowerLevel>,
}

impl ThresholdOverrides {
    fn apply(self, base: Thresholds) -> Thresholds {
        Thresholds {
            panic: self.panic.unwrap_or(base.panic),
            broadcast: self.broadcast.unwrap_or(base.broadcast),
            announcement: self.announcement.unwrap_or(base.announcement),
            question: self.question.unwrap_or(base.question),
            answer: self.answer.unwrap_or(base.answer),
            poll: self.poll.unwrap_or(base.poll),
            vote: self.vote.unwrap_or(base.vote),
        }
    }
}

fn view_thresholds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Thresholds, D::Error> {
    Ok(ThresholdOverrides::deserialize(deserializer)?.apply(Thresholds::default_view()))
}

fn create_thresholds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Thresholds, D::Error> {
    Ok(ThresholdOverrides::deserialize(deserializer)?.apply(Thresholds::default_create()))
}

/// Immutable rule set injected into the authorization gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTable {
    #[serde(default = "Thresholds::default_view", deserialize_with = "view_thresholds")]
    pub view: Thresholds,
    #[serde(default = "Thresholds::default_create", deserialize_with = "create_thresholds")]
    pub create: Thresholds,
    pub invite: PowerLevel,
    pub create_organization: PowerLevel,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            view: Thresholds::default_view(),
            create: Thresholds::default_create(),
            invite: PowerLevel::MODERATOR,
            create_organization: PowerLevel::ADMIN,
        }
    }
}

impl RuleTable {
    pub fn required_to_view(&self, kind: NotificationType) -> PowerLevel {
        self.view.get(kind)
    }

    pub fn required_to_create(&self, kind: NotificationType) -> PowerLevel {
        self.create.get(kind)
    }

    pub fn required(&self, action: Action) -> PowerLevel {
        match action {
            Action::View(kind) => self.required_to_view(kind),
            Action::Create(kind) => self.required_to_create(kind),
            Action::Invite => self.invite,
            Action::CreateOrganization => self.create_organization,
        }
    }

    /// Check if a level may perform an action
    pub fn permits(&self, level: PowerLevel, action: Action) -> bool {
        level >= self.required(action)
    }

    /// Check if an inviter may hand out a level
    pub fn can_grant(&self, actor: PowerLevel, granted: PowerLevel) -> bool {
        // Never above your own level
        if granted > actor {
            return false;
        }

        self.permits(actor, Action::Invite)
    }
}
