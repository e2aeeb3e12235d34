//! Organization model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// An organization is a chat room with an associated client app.
///
/// `room_id`, `name` and `package` are each unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Organization {
    #[validate(length(min = 1, message = "Room ID is required"))]
    pub room_id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Client app package identifier
    #[validate(length(min = 1, max = 255))]
    pub package: String,
    /// Deep-link scheme used for verification redirects
    #[validate(length(min = 1, max = 64))]
    pub intent: String,
}

impl Organization {
    pub fn new(room_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            name: name.into(),
            package: String::new(),
            intent: String::new(),
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = intent.into();
        self
    }

    /// Redirect target handed to the client app for an invite token
    pub fn verification_link(&self, token: &str) -> String {
        format!("{}://verify?hash={}", self.intent, token)
    }
}
