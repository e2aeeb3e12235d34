//! Error types for the notifier core

use std::panic::Location;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Not allowed: {0}")]
    Unauthorized(String),

    #[error("Missing reference")]
    MissingReference,

    #[error("Reference not found")]
    ReferenceNotFound,

    #[error("Invite already sent")]
    AlreadyInvited,

    #[error("Invite already consumed")]
    InviteConsumed,

    #[error("Secret mismatch")]
    SecretMismatch,

    #[error("Invalid email: {0}")]
    BadEmail(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Organization already exists: {0}")]
    OrganizationExists(String),

    #[error("Unknown room: {0}")]
    RoomUnknown(String),

    #[error("Membership service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Unknown(String),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(std::io::Error),
}

#[track_caller]
fn log_unexpected(err: &dyn std::fmt::Display) {
    let location = Location::caller();
    tracing::error!(
        file = location.file(),
        line = location.line(),
        error = %err,
        "Unexpected error"
    );
}

// Conversions used by `?` on storage and serialization calls. The location
// logged is the `?` site.
impl From<rusqlite::Error> for Error {
    #[track_caller]
    fn from(err: rusqlite::Error) -> Self {
        log_unexpected(&err);
        Error::Database(err)
    }
}

impl From<serde_json::Error> for Error {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        log_unexpected(&err);
        Error::Serialization(err)
    }
}

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        log_unexpected(&err);
        Error::Io(err)
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Invalid(errors.to_string())
    }
}

/// Boundary outcome an [`Error`] maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    BadRequest,
    Unavailable,
    Internal,
}

impl ErrorKind {
    /// Matrix-style error code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "M_UNKNOWN_TOKEN",
            ErrorKind::Forbidden => "M_FORBIDDEN",
            ErrorKind::NotFound => "M_NOT_FOUND",
            ErrorKind::Conflict => "M_CONFLICT",
            ErrorKind::BadRequest => "M_BAD_JSON",
            ErrorKind::Unavailable => "M_UNAVAILABLE",
            ErrorKind::Internal => "M_UNKNOWN",
        }
    }
}

impl Error {
    /// Wrap an unexpected failure, logging it with the caller's location.
    ///
    /// The detail is only ever written to the log; [`Error::public_message`]
    /// hides it from callers.
    #[track_caller]
    pub fn unknown(err: impl std::fmt::Display) -> Self {
        log_unexpected(&err);
        Error::Unknown(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Error::Unauthorized(_) | Error::SecretMismatch => ErrorKind::Forbidden,
            Error::ReferenceNotFound | Error::RoomUnknown(_) | Error::NotFound(_) => {
                ErrorKind::NotFound
            }
            Error::AlreadyInvited | Error::InviteConsumed | Error::OrganizationExists(_) => {
                ErrorKind::Conflict
            }
            Error::MissingReference
            | Error::BadEmail(_)
            | Error::Invalid(_)
            | Error::Registration(_) => {
                ErrorKind::BadRequest
            }
            Error::UpstreamUnavailable(_) => ErrorKind::Unavailable,
            Error::InvalidConfig(_)
            | Error::Unknown(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to hand back to a caller
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
