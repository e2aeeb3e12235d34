//! Data models for the notifier

mod invite;
mod notification;
mod organization;
mod power;
mod read_state;

pub use invite::*;
pub use notification::*;
pub use organization::*;
pub use power::*;
pub use read_state::*;
