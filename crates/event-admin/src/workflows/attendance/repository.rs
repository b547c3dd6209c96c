use serde::Serialize;

use super::domain::{
    Event, EventId, RegistrationId, RegistrationRecord, User, UserId, WinnerPosition,
};
use super::sorting::SortSpec;

/// Registration persistence so the services can be exercised in isolation.
pub trait RegistrationStore: Send + Sync {
    /// Approved registrations for an event joined with their users, in `sort` order.
    fn approved_by_event(
        &self,
        event_id: EventId,
        sort: SortSpec,
    ) -> Result<Vec<RegistrationRecord>, RepositoryError>;

    /// Every registration for an event regardless of moderation state, ordered by name.
    fn participants(&self, event_id: EventId) -> Result<Vec<RegistrationRecord>, RepositoryError>;

    fn set_attendance(
        &self,
        registration_id: RegistrationId,
        attended: bool,
    ) -> Result<(), RepositoryError>;

    /// Upsert of the position held by `user_id` in `event_id`. Last write wins.
    fn set_winner_position(
        &self,
        user_id: UserId,
        event_id: EventId,
        position: WinnerPosition,
    ) -> Result<(), RepositoryError>;
}

pub trait EventStore: Send + Sync {
    fn get(&self, event_id: EventId) -> Result<Option<Event>, RepositoryError>;
    /// All events, most recent first.
    fn all(&self) -> Result<Vec<Event>, RepositoryError>;
}

pub trait UserDirectory: Send + Sync {
    fn find(&self, user_id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound mail hook (SMTP, console, or a test double).
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// A rendered message with HTML and plain-text alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}
