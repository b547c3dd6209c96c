//! Winner selection: position persistence and certificate notifications.

mod certificate;
mod service;

pub use certificate::compose_certificate;
pub use service::{
    EntryOutcome, NotificationOutcome, ParticipantView, PositionSlot, SkipReason,
    WinnerAssignmentReport, WinnerAssignmentService, WinnerBoard, WinnerEntry,
    WinnerServiceError,
};
