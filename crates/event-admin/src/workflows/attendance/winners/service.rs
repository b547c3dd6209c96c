use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::super::domain::{Event, EventId, RegistrationId, UserId, WinnerPosition};
use super::super::repository::{
    EventStore, Mailer, RegistrationStore, RepositoryError, UserDirectory,
};
use super::certificate::compose_certificate;

/// One `position[<user id>]` field from the selection form, untrusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerEntry {
    pub user_id: String,
    pub position: String,
}

impl WinnerEntry {
    pub fn new(user_id: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            position: position.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPosition,
    InvalidUserId,
    InvalidPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    UserNotFound,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryOutcome {
    Skipped {
        user_id: String,
        reason: SkipReason,
    },
    PersistFailed {
        user_id: UserId,
        position: WinnerPosition,
        error: String,
    },
    Recorded {
        user_id: UserId,
        position: WinnerPosition,
        notification: NotificationOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinnerAssignmentReport {
    pub event_id: EventId,
    pub outcomes: Vec<EntryOutcome>,
    /// Confirmed sends only.
    pub notifications_sent: usize,
}

impl WinnerAssignmentReport {
    pub fn persisted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, EntryOutcome::Recorded { .. }))
            .count()
    }

    pub fn notifications_attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| {
                matches!(
                    outcome,
                    EntryOutcome::Recorded {
                        notification: NotificationOutcome::Sent | NotificationOutcome::Failed { .. },
                        ..
                    }
                )
            })
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    pub registration_id: RegistrationId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_position: Option<WinnerPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_label: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionSlot {
    pub position: WinnerPosition,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub filled: bool,
}

/// Selection page model: participants with their current award and which places are taken.
#[derive(Debug, Clone, Serialize)]
pub struct WinnerBoard {
    pub event: Event,
    pub participants: Vec<ParticipantView>,
    pub positions: Vec<PositionSlot>,
    pub winners_count: usize,
}

/// Validates, persists and announces winner positions entry by entry.
pub struct WinnerAssignmentService<S, E, U, M> {
    registrations: Arc<S>,
    events: Arc<E>,
    users: Arc<U>,
    mailer: Arc<M>,
    organizer: String,
}

impl<S, E, U, M> WinnerAssignmentService<S, E, U, M>
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        registrations: Arc<S>,
        events: Arc<E>,
        users: Arc<U>,
        mailer: Arc<M>,
        organizer: impl Into<String>,
    ) -> Self {
        Self {
            registrations,
            events,
            users,
            mailer,
            organizer: organizer.into(),
        }
    }

    pub fn board(&self, event_id: EventId) -> Result<WinnerBoard, WinnerServiceError> {
        let event = self
            .events
            .get(event_id)?
            .ok_or(WinnerServiceError::EventNotFound(event_id))?;

        let participants: Vec<ParticipantView> = self
            .registrations
            .participants(event_id)?
            .into_iter()
            .map(|record| ParticipantView {
                registration_id: record.registration.id,
                user_id: record.user.id,
                name: record.user.name,
                email: record.user.email,
                winner_position: record.registration.winner_position,
                position_label: record.registration.winner_position.map(WinnerPosition::label),
            })
            .collect();

        let positions = WinnerPosition::ordered()
            .into_iter()
            .map(|position| PositionSlot {
                position,
                label: position.label(),
                color: position.color(),
                icon: position.icon(),
                filled: participants
                    .iter()
                    .any(|participant| participant.winner_position == Some(position)),
            })
            .collect();

        let winners_count = participants
            .iter()
            .filter(|participant| participant.winner_position.is_some())
            .count();

        Ok(WinnerBoard {
            event,
            participants,
            positions,
            winners_count,
        })
    }

    /// Entries are independent: a failure on one is recorded in its outcome and the
    /// loop moves on. Only an unknown event aborts, before anything is written.
    pub fn assign<I>(
        &self,
        event_id: EventId,
        entries: I,
        awarded_on: NaiveDate,
    ) -> Result<WinnerAssignmentReport, WinnerServiceError>
    where
        I: IntoIterator<Item = WinnerEntry>,
    {
        let event = self
            .events
            .get(event_id)?
            .ok_or(WinnerServiceError::EventNotFound(event_id))?;

        let outcomes: Vec<EntryOutcome> = entries
            .into_iter()
            .map(|entry| self.process(&event, entry, awarded_on))
            .collect();

        let notifications_sent = outcomes
            .iter()
            .filter(|outcome| {
                matches!(
                    outcome,
                    EntryOutcome::Recorded {
                        notification: NotificationOutcome::Sent,
                        ..
                    }
                )
            })
            .count();

        info!(
            event_id = %event_id,
            entries = outcomes.len(),
            notifications_sent,
            "processed winner selection"
        );

        Ok(WinnerAssignmentReport {
            event_id,
            outcomes,
            notifications_sent,
        })
    }

    fn process(&self, event: &Event, entry: WinnerEntry, awarded_on: NaiveDate) -> EntryOutcome {
        let raw_position = entry.position.trim();
        if raw_position.is_empty() {
            return EntryOutcome::Skipped {
                user_id: entry.user_id,
                reason: SkipReason::NoPosition,
            };
        }
        let Some(user_id) = UserId::parse(&entry.user_id) else {
            warn!(user_id = %entry.user_id, "skipping winner entry with invalid user id");
            return EntryOutcome::Skipped {
                user_id: entry.user_id,
                reason: SkipReason::InvalidUserId,
            };
        };
        let Some(position) = WinnerPosition::parse(raw_position) else {
            warn!(%user_id, position = raw_position, "skipping unknown winner position");
            return EntryOutcome::Skipped {
                user_id: entry.user_id,
                reason: SkipReason::InvalidPosition,
            };
        };

        if let Err(err) = self
            .registrations
            .set_winner_position(user_id, event.id, position)
        {
            warn!(%user_id, event_id = %event.id, error = %err, "failed to store winner position");
            return EntryOutcome::PersistFailed {
                user_id,
                position,
                error: err.to_string(),
            };
        }

        let notification = match self.users.find(user_id) {
            Ok(Some(user)) => {
                let email =
                    compose_certificate(&user, &event.title, position, awarded_on, &self.organizer);
                match self.mailer.send(&email) {
                    Ok(()) => {
                        info!(%user_id, %position, "winner notification sent");
                        NotificationOutcome::Sent
                    }
                    Err(err) => {
                        warn!(%user_id, error = %err, "winner notification failed");
                        NotificationOutcome::Failed {
                            error: err.to_string(),
                        }
                    }
                }
            }
            Ok(None) => {
                warn!(%user_id, "winner has no user record, notification skipped");
                NotificationOutcome::UserNotFound
            }
            Err(err) => {
                warn!(%user_id, error = %err, "user lookup failed, notification skipped");
                NotificationOutcome::UserNotFound
            }
        };

        EntryOutcome::Recorded {
            user_id,
            position,
            notification,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WinnerServiceError {
    #[error("event {0} not found")]
    EventNotFound(EventId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
