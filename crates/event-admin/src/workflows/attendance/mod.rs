//! Event attendance tracking, reporting, export and winner selection.
//!
//! Stores and mail delivery sit behind the traits in [`repository`]; the
//! services here are synchronous and the router moves blocking work (mail
//! dispatch) off the async executor.

pub mod domain;
pub mod export;
pub mod mailer;
pub mod report;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod sorting;
pub mod winners;

#[cfg(test)]
mod tests;

pub use domain::{
    AttendanceStatus, Event, EventId, Registration, RegistrationId, RegistrationRecord,
    RegistrationStatus, TeamMember, User, UserId, WinnerPosition, UNKNOWN_DEPARTMENT,
};
pub use export::{
    ExportArtifact, ExportError, ExportFormat, ExportGenerator, PdfRenderer, TextPdfRenderer,
};
pub use mailer::{ConfiguredMailer, ConsoleMailer, SmtpMailer};
pub use report::{
    attendance_rate, AttendanceRating, AttendanceSummary, AttendanceView, DetailedReportView,
};
pub use repository::{
    EventStore, MailError, Mailer, OutboundEmail, RegistrationStore, RepositoryError,
    UserDirectory,
};
pub use roster::{RecordError, RejectedRow, RosterImport, RosterImportError, RosterImporter};
pub use router::{attendance_router, AdminServices, FlashLevel, FlashMessage};
pub use service::{AttendanceService, AttendanceServiceError};
pub use sorting::{SortKey, SortOrder, SortSpec};
pub use winners::{
    WinnerAssignmentReport, WinnerAssignmentService, WinnerBoard, WinnerEntry, WinnerServiceError,
};
