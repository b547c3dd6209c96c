use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use super::domain::{EventId, RegistrationId};
use super::export::{ExportArtifact, ExportFormat};
use super::repository::{EventStore, Mailer, RegistrationStore, UserDirectory};
use super::service::{AttendanceService, AttendanceServiceError};
use super::sorting::SortSpec;
use super::winners::{WinnerAssignmentService, WinnerEntry, WinnerServiceError};

pub const EXPORT_WARNING_HEADER: HeaderName = HeaderName::from_static("x-export-warning");

const EVENTS_PATH: &str = "/admin/events";
const ATTENDANCE_PATH: &str = "/admin/attendance";
const WINNERS_PATH: &str = "/admin/winners";

/// Services shared by every admin handler.
pub struct AdminServices<S, E, U, M> {
    pub attendance: Arc<AttendanceService<S, E>>,
    pub winners: Arc<WinnerAssignmentService<S, E, U, M>>,
}

impl<S, E, U, M> Clone for AdminServices<S, E, U, M> {
    fn clone(&self) -> Self {
        Self {
            attendance: Arc::clone(&self.attendance),
            winners: Arc::clone(&self.winners),
        }
    }
}

/// Router builder exposing the attendance, report, export and winner endpoints.
pub fn attendance_router<S, E, U, M>(services: AdminServices<S, E, U, M>) -> Router
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route(EVENTS_PATH, get(events_handler::<S, E, U, M>))
        .route(
            ATTENDANCE_PATH,
            get(attendance_handler::<S, E, U, M>).post(mark_attendance_handler::<S, E, U, M>),
        )
        .route("/admin/attendance/report", get(report_handler::<S, E, U, M>))
        .route("/admin/attendance/export", get(export_handler::<S, E, U, M>))
        .route(
            WINNERS_PATH,
            get(winner_board_handler::<S, E, U, M>).post(assign_winners_handler::<S, E, U, M>),
        )
        .with_state(services)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

impl FlashLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// User-facing notices carried across redirects as `flash=<code>&level=<level>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMessage {
    InvalidEvent,
    EventNotFound,
    AttendanceUpdated,
    AttendanceUpdateFailed,
    InvalidSubmission,
}

impl FlashMessage {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::InvalidEvent,
            Self::EventNotFound,
            Self::AttendanceUpdated,
            Self::AttendanceUpdateFailed,
            Self::InvalidSubmission,
        ]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidEvent => "invalid_event",
            Self::EventNotFound => "event_not_found",
            Self::AttendanceUpdated => "attendance_updated",
            Self::AttendanceUpdateFailed => "attendance_update_failed",
            Self::InvalidSubmission => "invalid_submission",
        }
    }

    pub const fn text(self) -> &'static str {
        match self {
            Self::InvalidEvent => "Please select a valid event.",
            Self::EventNotFound => "The requested event could not be found.",
            Self::AttendanceUpdated => "Attendance updated successfully.",
            Self::AttendanceUpdateFailed => "Failed to update attendance.",
            Self::InvalidSubmission => "The submitted form was incomplete.",
        }
    }

    pub const fn level(self) -> FlashLevel {
        match self {
            Self::AttendanceUpdated => FlashLevel::Success,
            Self::AttendanceUpdateFailed => FlashLevel::Warning,
            _ => FlashLevel::Danger,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|message| message.code() == code)
    }

    /// `303 See Other` to `path` with this message appended to the query string.
    pub fn redirect(self, path: &str) -> Response {
        let separator = if path.contains('?') { '&' } else { '?' };
        let target = format!(
            "{path}{separator}flash={}&level={}",
            self.code(),
            self.level().as_str()
        );
        Redirect::to(&target).into_response()
    }

    fn view(self) -> FlashView {
        FlashView {
            code: self.code(),
            text: self.text(),
            level: self.level(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlashView {
    pub code: &'static str,
    pub text: &'static str,
    pub level: FlashLevel,
}

/// Page payload with an optional notice decoded from the `flash` parameter.
#[derive(Debug, Serialize)]
struct Page<T> {
    #[serde(flatten)]
    view: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    flash: Option<FlashView>,
}

impl<T: Serialize> Page<T> {
    fn new(view: T, flash: Option<&str>) -> Self {
        Self {
            view,
            flash: flash.and_then(FlashMessage::from_code).map(FlashMessage::view),
        }
    }

    fn respond(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventQuery {
    event_id: Option<String>,
    sort: Option<String>,
    order: Option<String>,
    format: Option<String>,
    flash: Option<String>,
    success: Option<String>,
    notifications: Option<String>,
}

impl EventQuery {
    fn event_id(&self) -> Option<EventId> {
        self.event_id.as_deref().and_then(EventId::parse)
    }

    fn sort(&self) -> SortSpec {
        SortSpec::resolve(self.sort.as_deref(), self.order.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MarkAttendanceForm {
    registration_id: Option<String>,
    event_id: Option<String>,
    attended: Option<String>,
}

pub(crate) async fn events_handler<S, E, U, M>(
    State(services): State<AdminServices<S, E, U, M>>,
    Query(query): Query<EventQuery>,
) -> Response
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    match services.attendance.events() {
        Ok(events) => Page::new(
            json!({
                "events": events,
                "pdf_export": services.attendance.pdf_available(),
            }),
            query.flash.as_deref(),
        )
        .respond(),
        Err(other) => internal_error(&other),
    }
}

pub(crate) async fn attendance_handler<S, E, U, M>(
    State(services): State<AdminServices<S, E, U, M>>,
    Query(query): Query<EventQuery>,
) -> Response
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    let Some(event_id) = query.event_id() else {
        return FlashMessage::InvalidEvent.redirect(EVENTS_PATH);
    };

    match services.attendance.attendance(event_id, query.sort()) {
        Ok(view) => Page::new(view, query.flash.as_deref()).respond(),
        Err(err) => attendance_error(err),
    }
}

pub(crate) async fn mark_attendance_handler<S, E, U, M>(
    State(services): State<AdminServices<S, E, U, M>>,
    Form(form): Form<MarkAttendanceForm>,
) -> Response
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    let Some(event_id) = form.event_id.as_deref().and_then(EventId::parse) else {
        return FlashMessage::InvalidEvent.redirect(EVENTS_PATH);
    };
    let back = format!("{ATTENDANCE_PATH}?event_id={event_id}");
    let Some(registration_id) = form
        .registration_id
        .as_deref()
        .and_then(RegistrationId::parse)
    else {
        return FlashMessage::InvalidSubmission.redirect(&back);
    };
    let attended = form.attended.as_deref().is_some_and(checkbox_checked);

    match services
        .attendance
        .mark_attendance(registration_id, attended)
    {
        Ok(()) => FlashMessage::AttendanceUpdated.redirect(&back),
        Err(err) => {
            warn!(%registration_id, error = %err, "attendance update failed");
            FlashMessage::AttendanceUpdateFailed.redirect(&back)
        }
    }
}

pub(crate) async fn report_handler<S, E, U, M>(
    State(services): State<AdminServices<S, E, U, M>>,
    Query(query): Query<EventQuery>,
) -> Response
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    let Some(event_id) = query.event_id() else {
        return FlashMessage::InvalidEvent.redirect(EVENTS_PATH);
    };

    let attendance = Arc::clone(&services.attendance);
    let outcome = tokio::task::spawn_blocking(move || attendance.report(event_id)).await;

    match outcome {
        Ok(Ok(view)) => Page::new(view, query.flash.as_deref()).respond(),
        Ok(Err(err)) => attendance_error(err),
        Err(join) => internal_error(&join),
    }
}

pub(crate) async fn export_handler<S, E, U, M>(
    State(services): State<AdminServices<S, E, U, M>>,
    Query(query): Query<EventQuery>,
) -> Response
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    let Some(event_id) = query.event_id() else {
        return FlashMessage::InvalidEvent.redirect(EVENTS_PATH);
    };
    let format = ExportFormat::resolve(query.format.as_deref());
    let sort = query.sort();

    // PDF rendering and the store reads are synchronous.
    let attendance = Arc::clone(&services.attendance);
    let outcome =
        tokio::task::spawn_blocking(move || attendance.export(event_id, format, sort)).await;

    match outcome {
        Ok(Ok(artifact)) => artifact.into_response(),
        Ok(Err(err)) => attendance_error(err),
        Err(join) => internal_error(&join),
    }
}

pub(crate) async fn winner_board_handler<S, E, U, M>(
    State(services): State<AdminServices<S, E, U, M>>,
    Query(query): Query<EventQuery>,
) -> Response
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    let Some(event_id) = query.event_id() else {
        return FlashMessage::InvalidEvent.redirect(EVENTS_PATH);
    };

    match services.winners.board(event_id) {
        Ok(board) => {
            let saved = query.success.as_deref() == Some("true");
            let notifications = query
                .notifications
                .as_deref()
                .and_then(|raw| raw.parse::<usize>().ok());
            let payload = json!({
                "board": board,
                "saved": saved,
                "notifications_sent": notifications,
            });
            Page::new(payload, query.flash.as_deref()).respond()
        }
        Err(WinnerServiceError::EventNotFound(_)) => {
            FlashMessage::EventNotFound.redirect(EVENTS_PATH)
        }
        Err(other) => internal_error(&other),
    }
}

pub(crate) async fn assign_winners_handler<S, E, U, M>(
    State(services): State<AdminServices<S, E, U, M>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
    U: UserDirectory + 'static,
    M: Mailer + 'static,
{
    let (event_id, entries) = winner_form(fields);
    let Some(event_id) = event_id else {
        return FlashMessage::InvalidSubmission.redirect(EVENTS_PATH);
    };

    let winners = Arc::clone(&services.winners);
    let awarded_on = Utc::now().date_naive();
    let outcome =
        tokio::task::spawn_blocking(move || winners.assign(event_id, entries, awarded_on)).await;

    match outcome {
        Ok(Ok(report)) => Redirect::to(&format!(
            "{WINNERS_PATH}?event_id={event_id}&success=true&notifications={}",
            report.notifications_sent
        ))
        .into_response(),
        Ok(Err(WinnerServiceError::EventNotFound(_))) => {
            FlashMessage::EventNotFound.redirect(EVENTS_PATH)
        }
        Ok(Err(other)) => internal_error(&other),
        Err(join) => internal_error(&join),
    }
}

/// Split a winner form into its `eventId` and the `position[<user id>]` entries,
/// keeping submission order.
pub(crate) fn winner_form(fields: Vec<(String, String)>) -> (Option<EventId>, Vec<WinnerEntry>) {
    let mut event_id = None;
    let mut entries = Vec::new();

    for (key, value) in fields {
        if key == "eventId" {
            event_id = EventId::parse(&value);
        } else if let Some(user_id) = key
            .strip_prefix("position[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            entries.push(WinnerEntry::new(user_id, value));
        }
    }

    (event_id, entries)
}

fn checkbox_checked(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

fn attendance_error(err: AttendanceServiceError) -> Response {
    match err {
        AttendanceServiceError::EventNotFound(_) => FlashMessage::EventNotFound.redirect(EVENTS_PATH),
        other => internal_error(&other),
    }
}

fn internal_error(err: &dyn std::error::Error) -> Response {
    error!(error = %err, "admin request failed");
    let payload = json!({
        "error": err.to_string(),
    });
    (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
}

impl IntoResponse for ExportArtifact {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        let mut response = (StatusCode::OK, self.bytes).into_response();
        let headers = response.headers_mut();

        if let Ok(value) = HeaderValue::from_str(self.content_type.as_ref()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        if let Some(value) = self
            .warning
            .as_deref()
            .and_then(|warning| HeaderValue::from_str(warning).ok())
        {
            headers.insert(EXPORT_WARNING_HEADER, value);
        }

        response
    }
}
