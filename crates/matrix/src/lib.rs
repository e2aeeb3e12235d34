//! Notifier Matrix Library
//!
//! Blocking HTTP client for the homeserver that owns room membership, power
//! levels and accounts. Implements the core `MembershipService` and
//! `AccountService` seams.
//!
//! # Usage
//!
//! ```ignore
//! let client = MatrixClient::new("https://matrix.example.org", token, Duration::from_secs(5))?;
//! let gate = AuthorizationGate::new(rules, &db, &client);
//! ```

pub mod client;
pub mod error;

pub use client::{first_email, MatrixClient, ThirdPartyId};
pub use error::{Error, Result};
