//! Outbound invite mail seam

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Data rendered into an invite email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteEmail {
    pub organization: String,
    /// The capability token
    pub secret: String,
    /// Verification link on this server
    pub link: String,
}

/// Delivers invite emails
pub trait Mailer {
    fn send(&self, to: &str, email: &InviteEmail) -> Result<()>;
}

/// Mailer that only writes deliveries to the log
pub struct LogMailer {
    from: String,
    subject: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            subject: subject.into(),
        }
    }
}

impl Mailer for LogMailer {
    fn send(&self, to: &str, email: &InviteEmail) -> Result<()> {
        info!(
            from = %self.from,
            to,
            subject = %self.subject,
            organization = %email.organization,
            link = %email.link,
            "Invite email"
        );
        Ok(())
    }
}
