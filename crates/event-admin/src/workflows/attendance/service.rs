use std::sync::Arc;

use tracing::{debug, info};

use super::domain::{Event, EventId, RegistrationId, RegistrationRecord};
use super::export::{ExportArtifact, ExportError, ExportFormat, ExportGenerator};
use super::report::{AttendanceSummary, AttendanceView, DetailedReportView};
use super::repository::{EventStore, RegistrationStore, RepositoryError};
use super::sorting::SortSpec;

/// Read side of the attendance pages plus the check-in toggle.
pub struct AttendanceService<S, E> {
    registrations: Arc<S>,
    events: Arc<E>,
    exporter: ExportGenerator,
}

impl<S, E> AttendanceService<S, E>
where
    S: RegistrationStore + 'static,
    E: EventStore + 'static,
{
    pub fn new(registrations: Arc<S>, events: Arc<E>, exporter: ExportGenerator) -> Self {
        Self {
            registrations,
            events,
            exporter,
        }
    }

    pub fn pdf_available(&self) -> bool {
        self.exporter.pdf_available()
    }

    pub fn events(&self) -> Result<Vec<Event>, AttendanceServiceError> {
        Ok(self.events.all()?)
    }

    pub fn attendance(
        &self,
        event_id: EventId,
        sort: SortSpec,
    ) -> Result<AttendanceView, AttendanceServiceError> {
        let (event, records) = self.load(event_id, sort)?;
        let summary = AttendanceSummary::from_records(&records);
        Ok(summary.overview(&event, &records, sort))
    }

    pub fn report(&self, event_id: EventId) -> Result<DetailedReportView, AttendanceServiceError> {
        let sort = SortSpec::default();
        let (event, records) = self.load(event_id, sort)?;
        let summary = AttendanceSummary::from_records(&records);
        debug!(
            event_id = %event_id,
            total = summary.total,
            departments = summary.departments.len(),
            "built attendance report"
        );
        Ok(summary.detailed(&event, &records, sort))
    }

    pub fn export(
        &self,
        event_id: EventId,
        format: ExportFormat,
        sort: SortSpec,
    ) -> Result<ExportArtifact, AttendanceServiceError> {
        let (event, records) = self.load(event_id, sort)?;
        Ok(self.exporter.export(&event, &records, format)?)
    }

    pub fn mark_attendance(
        &self,
        registration_id: RegistrationId,
        attended: bool,
    ) -> Result<(), AttendanceServiceError> {
        self.registrations
            .set_attendance(registration_id, attended)?;
        info!(registration_id = %registration_id, attended, "updated attendance");
        Ok(())
    }

    fn load(
        &self,
        event_id: EventId,
        sort: SortSpec,
    ) -> Result<(Event, Vec<RegistrationRecord>), AttendanceServiceError> {
        let event = self
            .events
            .get(event_id)?
            .ok_or(AttendanceServiceError::EventNotFound(event_id))?;
        let records = self.registrations.approved_by_event(event_id, sort)?;
        Ok((event, records))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttendanceServiceError {
    #[error("event {0} not found")]
    EventNotFound(EventId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
