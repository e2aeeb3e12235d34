//! CLI command definitions and dispatch

use std::path::PathBuf;

use base64::Engine;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use rand::RngCore;
use serde::Serialize;

use notifier_core::{
    Account, Content, NewNotification, NotificationType, Organization, OrganizationService,
    PowerLevel, Result,
};

use crate::context::Context;

/// Per-organization notification broker
#[derive(Debug, Parser)]
#[command(name = "notifier", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print a fresh random server secret
    GenSecret,
    /// Organization management
    #[command(subcommand)]
    Org(OrgCommand),
    /// Invite an email into an organization
    Invite(InviteArgs),
    /// Check an invite token against an organization and email
    VerifyToken(VerifyTokenArgs),
    /// Print the client app redirect for an invite token
    Redirect(RedirectArgs),
    /// Redeem an invite token
    Accept(AcceptArgs),
    /// Notification commands
    #[command(subcommand)]
    Notifications(NotificationCommand),
    /// Mark everything up to now (or --at) as read
    MarkRead(MarkReadArgs),
}

#[derive(Debug, Subcommand)]
pub enum OrgCommand {
    /// Create an organization for a room
    Create(CreateOrgArgs),
    /// Show one organization
    Get { room: String },
    /// List all organizations
    List,
}

#[derive(Debug, Args)]
pub struct CreateOrgArgs {
    /// Caller's access token
    #[arg(long)]
    pub token: String,
    #[arg(long)]
    pub room: String,
    #[arg(long)]
    pub name: String,
    /// Client app package identifier
    #[arg(long)]
    pub package: String,
    /// Deep-link scheme of the client app
    #[arg(long)]
    pub intent: String,
    /// Invite this address as the organization's admin
    #[arg(long)]
    pub owner_email: Option<String>,
}

#[derive(Debug, Args)]
pub struct InviteArgs {
    #[arg(long)]
    pub token: String,
    #[arg(long)]
    pub room: String,
    #[arg(long)]
    pub email: String,
    /// Power level granted on acceptance
    #[arg(long, default_value_t = 0)]
    pub level: i64,
}

#[derive(Debug, Args)]
pub struct VerifyTokenArgs {
    #[arg(long)]
    pub room: String,
    #[arg(long)]
    pub email: String,
    pub hash: String,
}

#[derive(Debug, Args)]
pub struct RedirectArgs {
    #[arg(long)]
    pub room: String,
    pub hash: String,
}

#[derive(Debug, Args)]
pub struct AcceptArgs {
    #[arg(long)]
    pub room: String,
    pub hash: String,
    /// Accept with an existing account
    #[arg(long, conflicts_with_all = ["username", "password", "email"])]
    pub token: Option<String>,
    /// Register a new account
    #[arg(long, requires_all = ["password", "email"])]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
}

impl AcceptArgs {
    fn account(&self) -> Option<Account> {
        if let Some(token) = &self.token {
            return Some(Account::Existing {
                access_token: token.clone(),
            });
        }
        match (&self.username, &self.password, &self.email) {
            (Some(username), Some(password), Some(email)) => Some(Account::New {
                username: username.clone(),
                password: password.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum NotificationCommand {
    /// List visible notifications
    List {
        #[arg(long)]
        token: String,
        /// Only notifications created at or after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Show one notification
    Show {
        #[arg(long)]
        token: String,
        id: String,
    },
    /// Post a notification
    Create(CreateNotificationArgs),
}

#[derive(Debug, Args)]
pub struct CreateNotificationArgs {
    #[arg(long)]
    pub token: String,
    #[arg(long)]
    pub room: String,
    #[arg(long = "type")]
    pub kind: NotificationType,
    #[arg(long)]
    pub text: String,
    #[arg(long, default_value_t = 0)]
    pub priority: i32,
    /// Referenced question or poll
    #[arg(long = "ref")]
    pub reference: Option<String>,
    #[arg(long)]
    pub collapse_key: Option<String>,
    /// Poll choice as LABEL=VALUE, repeatable
    #[arg(long = "choice", value_parser = parse_choice)]
    pub choices: Vec<(String, String)>,
}

impl CreateNotificationArgs {
    fn to_new(&self) -> NewNotification {
        let mut content = Content::text(self.text.clone());
        if let Some(reference) = &self.reference {
            content = content.with_reference(reference.clone());
        }
        if let Some(key) = &self.collapse_key {
            content = content.with_collapse_key(key.clone());
        }
        for (label, value) in &self.choices {
            content = content.with_choice(label.clone(), value.clone());
        }
        NewNotification::new(self.room.clone(), self.kind, content).with_priority(self.priority)
    }
}

#[derive(Debug, Args)]
pub struct MarkReadArgs {
    #[arg(long)]
    pub token: String,
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

fn parse_choice(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((label, value)) if !label.is_empty() => Ok((label.to_string(), value.to_string())),
        _ => Err(format!("expected LABEL=VALUE, got '{}'", s)),
    }
}

/// 32 random bytes, base64
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Cli {
    pub fn execute(&self) -> Result<()> {
        if let Commands::GenSecret = self.command {
            println!("{}", generate_secret());
            return Ok(());
        }

        let ctx = Context::load(self.config.as_deref())?;
        let gate = ctx.gate();
        let orgs = OrganizationService::new(
            &gate,
            ctx.tokens(),
            &ctx.mailer,
            ctx.config.server.public_url.clone(),
        );

        match &self.command {
            Commands::GenSecret => Ok(()),
            Commands::Org(OrgCommand::Create(args)) => {
                let org = Organization::new(args.room.clone(), args.name.clone())
                    .with_package(args.package.clone())
                    .with_intent(args.intent.clone());
                print_json(&orgs.create_organization(
                    &args.token,
                    org,
                    args.owner_email.as_deref(),
                )?)
            }
            Commands::Org(OrgCommand::Get { room }) => print_json(&orgs.get(room)?),
            Commands::Org(OrgCommand::List) => print_json(&orgs.list()?),
            Commands::Invite(args) => print_json(&orgs.invite(
                &args.token,
                &args.room,
                &args.email,
                PowerLevel(args.level),
            )?),
            Commands::VerifyToken(args) => {
                let valid = ctx.tokens().verify(&args.room, &args.email, &args.hash);
                println!("{}", if valid { "valid" } else { "invalid" });
                Ok(())
            }
            Commands::Redirect(args) => {
                println!("{}", orgs.verification_redirect(&args.room, &args.hash)?);
                Ok(())
            }
            Commands::Accept(args) => {
                let account = args.account().ok_or_else(|| {
                    notifier_core::Error::Invalid(
                        "pass --token, or --username, --password and --email".into(),
                    )
                })?;
                print_json(&orgs.accept_invite(&args.room, &args.hash, account)?)
            }
            Commands::Notifications(NotificationCommand::List { token, since }) => {
                print_json(&gate.list_notifications(token, *since)?)
            }
            Commands::Notifications(NotificationCommand::Show { token, id }) => {
                print_json(&gate.find_notification(token, id)?)
            }
            Commands::Notifications(NotificationCommand::Create(args)) => {
                print_json(&gate.create_notification(&args.token, args.to_new())?)
            }
            Commands::MarkRead(args) => {
                let at = args.at.unwrap_or_else(Utc::now);
                print_json(&gate.mark_read(&args.token, at)?)
            }
        }
    }
}
