//! Organization creation and the invitation flow
//!
//! An invite is a row keyed by its capability token. The invitee proves
//! knowledge of the invited email by presenting the token back; the server
//! recomputes it instead of looking up a stored secret.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::{Validate, ValidateEmail};

use crate::error::{Error, Result};
use crate::gate::AuthorizationGate;
use crate::mail::{InviteEmail, Mailer};
use crate::membership::{AccountService, MembershipService, Registration};
use crate::models::{InviteCapability, Organization, PowerLevel};
use crate::rules::Action;
use crate::storage::{Database, InviteRepository, OrganizationRepository};
use crate::token::{normalize_email, InviteTokenService};

/// How the invitee identifies themselves when accepting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    /// Already registered; the email comes from the account
    Existing { access_token: String },
    /// Register a new account for the invited email
    New {
        username: String,
        password: String,
        email: String,
    },
}

/// Outcome of a successful acceptance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedInvite {
    pub user_id: String,
    pub room_id: String,
    pub level: PowerLevel,
    /// Present when a new account was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
}

pub struct OrganizationService<'a, D, M>
where
    D: MembershipService + AccountService + ?Sized,
    M: Mailer + ?Sized,
{
    gate: &'a AuthorizationGate<'a, Database, D>,
    tokens: InviteTokenService,
    mailer: &'a M,
    public_url: String,
}

impl<'a, D, M> OrganizationService<'a, D, M>
where
    D: MembershipService + AccountService + ?Sized,
    M: Mailer + ?Sized,
{
    pub fn new(
        gate: &'a AuthorizationGate<'a, Database, D>,
        tokens: InviteTokenService,
        mailer: &'a M,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            tokens,
            mailer,
            public_url: public_url.into(),
        }
    }

    fn db(&self) -> &'a Database {
        self.gate.storage()
    }

    /// Link the invitee follows to verify their token
    pub fn verify_link(&self, room_id: &str, token: &str) -> String {
        format!(
            "{}/_matrix/client/r0/organisation/{}/verify?hash={}",
            self.public_url.trim_end_matches('/'),
            room_id,
            token
        )
    }

    /// Create an organization, optionally inviting its owner as admin.
    ///
    /// The organization row, the owner invite and the owner email succeed or
    /// fail together.
    #[instrument(skip(self, access_token, org), fields(room_id = %org.room_id))]
    pub fn create_organization(
        &self,
        access_token: &str,
        org: Organization,
        owner_email: Option<&str>,
    ) -> Result<Organization> {
        org.validate()?;
        self.gate
            .authorize(access_token, &org.room_id, Action::CreateOrganization)?;

        self.db().transaction(|tx| {
            tx.create_organization(&org)?;
            if let Some(email) = owner_email {
                self.send_invite(tx, &org, email, PowerLevel::ADMIN)?;
            }
            Ok(())
        })?;

        info!(name = %org.name, "Organization created");
        Ok(org)
    }

    /// Invite an email into an organization at `level`
    #[instrument(skip(self, access_token, email))]
    pub fn invite(
        &self,
        access_token: &str,
        room_id: &str,
        email: &str,
        level: PowerLevel,
    ) -> Result<InviteCapability> {
        let inviter = self.gate.authorize(access_token, room_id, Action::Invite)?;
        if !self.gate.rules().can_grant(inviter.level, level) {
            warn!(
                inviter = %inviter.user_id,
                level = inviter.level.value(),
                granted = level.value(),
                "Invite above own level"
            );
            return Err(Error::Unauthorized(format!(
                "Cannot grant power level {} from {}",
                level, inviter.level
            )));
        }

        let org = self
            .db()
            .find_organization(room_id)?
            .ok_or_else(|| Error::NotFound(format!("Organization {}", room_id)))?;

        let invite = self
            .db()
            .transaction(|tx| self.send_invite(tx, &org, email, level))?;

        info!(inviter = %inviter.user_id, level = level.value(), "Invite sent");
        Ok(invite)
    }

    fn send_invite(
        &self,
        tx: &Database,
        org: &Organization,
        email: &str,
        level: PowerLevel,
    ) -> Result<InviteCapability> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(Error::BadEmail(email));
        }

        let hash = self.tokens.hash(&org.room_id, &email);
        let invite = InviteCapability::new(hash, org.room_id.clone(), level);
        tx.create_invite(&invite)?;

        let message = InviteEmail {
            organization: org.name.clone(),
            secret: invite.hash.clone(),
            link: self.verify_link(&org.room_id, &invite.hash),
        };
        self.mailer.send(&email, &message)?;

        Ok(invite)
    }

    /// Deep link into the organization's client app for a pending invite
    #[instrument(skip(self, token))]
    pub fn verification_redirect(&self, room_id: &str, token: &str) -> Result<String> {
        let not_found = || Error::NotFound("Invite".into());

        let invite = self.db().find_invite(token)?.ok_or_else(not_found)?;
        if invite.room_id != room_id {
            return Err(not_found());
        }

        let org = self
            .db()
            .find_organization(&invite.room_id)?
            .ok_or_else(|| Error::NotFound(format!("Organization {}", room_id)))?;

        Ok(org.verification_link(token))
    }

    /// Redeem an invite token for an existing or newly registered account
    #[instrument(skip(self, token, account))]
    pub fn accept_invite(
        &self,
        room_id: &str,
        token: &str,
        account: Account,
    ) -> Result<AcceptedInvite> {
        let accounts = self.gate.directory();

        let email = match &account {
            Account::Existing { access_token } => accounts
                .email(access_token)?
                .ok_or_else(|| Error::BadEmail("Account has no verified email".into()))?,
            Account::New { email, .. } => email.clone(),
        };

        if !self.tokens.verify(room_id, &email, token) {
            warn!("Invite token does not match");
            return Err(Error::SecretMismatch);
        }

        let invite = self
            .db()
            .find_invite(token)?
            .ok_or_else(|| Error::NotFound("Invite".into()))?;
        if invite.is_consumed() {
            return Err(Error::InviteConsumed);
        }

        let holder = match &account {
            Account::Existing { access_token } => accounts.whoami(access_token)?,
            Account::New { username, .. } => format!("pending:{}", username),
        };

        // The invite stays claimed while the account is registered; a failed
        // registration rolls the claim back.
        let (user_id, registration) = self.db().transaction(|db| {
            if !db.attach_invite_user(token, &holder)? {
                return Err(Error::InviteConsumed);
            }
            match &account {
                Account::Existing { .. } => Ok((holder.clone(), None)),
                Account::New {
                    username, password, ..
                } => {
                    let registration = accounts.register(username, password)?;
                    db.reassign_invite_user(token, &holder, &registration.user_id)?;
                    Ok((registration.user_id.clone(), Some(registration)))
                }
            }
        })?;

        info!(%user_id, level = invite.level.value(), "Invite accepted");
        Ok(AcceptedInvite {
            user_id,
            room_id: invite.room_id,
            level: invite.level,
            registration,
        })
    }

    pub fn get(&self, room_id: &str) -> Result<Organization> {
        self.db()
            .find_organization(room_id)?
            .ok_or_else(|| Error::NotFound(format!("Organization {}", room_id)))
    }

    pub fn list(&self) -> Result<Vec<Organization>> {
        self.db().list_organizations()
    }
}
