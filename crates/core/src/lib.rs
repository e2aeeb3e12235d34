//! Notifier Core Library
//!
//! Notification authorization and integrity engine: rule table, power level
//! resolution, reference validation, storage, and invite capability tokens.

pub mod config;
pub mod error;
pub mod gate;
pub mod mail;
pub mod membership;
pub mod models;
pub mod organization;
pub mod rules;
pub mod storage;
pub mod token;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use gate::{AuthorizationGate, Authenticated, Decision, RoomResolved, Unauthenticated};
pub use mail::{InviteEmail, LogMailer, Mailer};
pub use membership::{
    AccountService, MembershipService, PowerLevelResolver, Registration, RoomPowerLevels,
};
pub use models::*;
pub use organization::{AcceptedInvite, Account, OrganizationService};
pub use rules::{Action, RuleTable, Thresholds};
pub use storage::{
    Database, InviteRepository, NotificationRepository, OrganizationRepository,
    ReadStateRepository, Storage,
};
pub use token::InviteTokenService;
pub use validation::ReferenceValidator;
