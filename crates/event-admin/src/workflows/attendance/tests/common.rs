use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::attendance::domain::{
    Event, EventId, Registration, RegistrationId, RegistrationRecord, RegistrationStatus, User,
    UserId, WinnerPosition,
};
use crate::workflows::attendance::export::{ExportGenerator, PdfDocument, PdfError, PdfRenderer};
use crate::workflows::attendance::repository::{
    EventStore, MailError, Mailer, OutboundEmail, RegistrationStore, RepositoryError,
    UserDirectory,
};
use crate::workflows::attendance::sorting::SortSpec;
use crate::workflows::attendance::{
    attendance_router, AdminServices, AttendanceService, WinnerAssignmentService,
};

pub(super) const EVENT: EventId = EventId(42);

pub(super) fn event() -> Event {
    Event {
        id: EVENT,
        title: "Robotics Cup".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 10, 12).expect("valid date"),
        time: NaiveTime::from_hms_opt(14, 30, 0).expect("valid time"),
        venue: "Main Hall".to_string(),
        room: "B-12".to_string(),
        category: "Technical".to_string(),
        team_based: true,
        max_participants: 40,
    }
}

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn record(
    id: u64,
    name: &str,
    department: Option<&str>,
    checked_in: bool,
    created_at: DateTime<Utc>,
) -> RegistrationRecord {
    let user_id = UserId(100 + id);
    RegistrationRecord {
        registration: Registration {
            id: RegistrationId(id),
            event_id: EVENT,
            user_id,
            status: RegistrationStatus::Approved,
            team_name: None,
            members: Vec::new(),
            checked_in,
            created_at,
            winner_position: None,
        },
        user: User {
            id: user_id,
            name: name.to_string(),
            email: format!("{}@example.edu", name.to_lowercase().replace(' ', ".")),
            department: department.map(str::to_string),
        },
    }
}

/// Five approved registrations, two of them checked in.
pub(super) fn roster() -> Vec<RegistrationRecord> {
    vec![
        record(1, "Priya Nair", Some("CSE"), true, at(1, 9)),
        record(2, "Arjun Mehta", Some("ECE"), true, at(1, 17)),
        record(3, "Zoe Park", Some("CSE"), false, at(3, 10)),
        record(4, "Liam O'Neil", None, false, at(2, 11)),
        record(5, "Mei Chen", Some("CSE"), false, at(3, 8)),
    ]
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) events: Arc<Mutex<BTreeMap<EventId, Event>>>,
    pub(super) registrations: Arc<Mutex<Vec<RegistrationRecord>>>,
    pub(super) users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl MemoryStore {
    pub(super) fn seeded(records: Vec<RegistrationRecord>) -> Self {
        let store = Self::default();
        store
            .events
            .lock()
            .expect("store mutex poisoned")
            .insert(EVENT, event());
        {
            let mut users = store.users.lock().expect("store mutex poisoned");
            for record in &records {
                users.insert(record.user.id, record.user.clone());
            }
        }
        *store.registrations.lock().expect("store mutex poisoned") = records;
        store
    }

    pub(super) fn forget_user(&self, user_id: UserId) {
        self.users
            .lock()
            .expect("store mutex poisoned")
            .remove(&user_id);
    }

    pub(super) fn registration(&self, id: RegistrationId) -> Option<RegistrationRecord> {
        self.registrations
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .find(|record| record.registration.id == id)
            .cloned()
    }

    pub(super) fn positions(&self) -> Vec<(UserId, WinnerPosition)> {
        self.registrations
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter_map(|record| {
                record
                    .registration
                    .winner_position
                    .map(|position| (record.user.id, position))
            })
            .collect()
    }
}

impl RegistrationStore for MemoryStore {
    fn approved_by_event(
        &self,
        event_id: EventId,
        sort: SortSpec,
    ) -> Result<Vec<RegistrationRecord>, RepositoryError> {
        let mut records: Vec<RegistrationRecord> = self
            .registrations
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|record| {
                record.registration.event_id == event_id
                    && record.registration.status == RegistrationStatus::Approved
            })
            .cloned()
            .collect();
        sort.sort(&mut records);
        Ok(records)
    }

    fn participants(&self, event_id: EventId) -> Result<Vec<RegistrationRecord>, RepositoryError> {
        let mut records: Vec<RegistrationRecord> = self
            .registrations
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|record| record.registration.event_id == event_id)
            .cloned()
            .collect();
        SortSpec::default().sort(&mut records);
        Ok(records)
    }

    fn set_attendance(
        &self,
        registration_id: RegistrationId,
        attended: bool,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.registrations.lock().expect("store mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| record.registration.id == registration_id)
            .ok_or(RepositoryError::NotFound)?;
        record.registration.checked_in = attended;
        Ok(())
    }

    fn set_winner_position(
        &self,
        user_id: UserId,
        event_id: EventId,
        position: WinnerPosition,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.registrations.lock().expect("store mutex poisoned");
        let mut matched = false;
        for record in guard.iter_mut().filter(|record| {
            record.registration.user_id == user_id && record.registration.event_id == event_id
        }) {
            record.registration.winner_position = Some(position);
            matched = true;
        }
        if matched {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

impl EventStore for MemoryStore {
    fn get(&self, event_id: EventId) -> Result<Option<Event>, RepositoryError> {
        Ok(self
            .events
            .lock()
            .expect("store mutex poisoned")
            .get(&event_id)
            .cloned())
    }

    fn all(&self) -> Result<Vec<Event>, RepositoryError> {
        let mut events: Vec<Event> = self
            .events
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        events.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(events)
    }
}

impl UserDirectory for MemoryStore {
    fn find(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .expect("store mutex poisoned")
            .get(&user_id)
            .cloned())
    }
}

/// Records deliveries; addresses in `rejected` fail with a transport error.
#[derive(Default, Clone)]
pub(super) struct MemoryMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    attempts: Arc<Mutex<usize>>,
    rejected: Arc<Mutex<HashSet<String>>>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn attempts(&self) -> usize {
        *self.attempts.lock().expect("mailer mutex poisoned")
    }

    pub(super) fn reject(&self, address: &str) {
        self.rejected
            .lock()
            .expect("mailer mutex poisoned")
            .insert(address.to_string());
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        *self.attempts.lock().expect("mailer mutex poisoned") += 1;
        if self
            .rejected
            .lock()
            .expect("mailer mutex poisoned")
            .contains(&email.to_email)
        {
            return Err(MailError::Transport("connection timed out".to_string()));
        }
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(email.clone());
        Ok(())
    }
}

pub(super) struct UnavailableStore;

impl RegistrationStore for UnavailableStore {
    fn approved_by_event(
        &self,
        _event_id: EventId,
        _sort: SortSpec,
    ) -> Result<Vec<RegistrationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn participants(&self, _event_id: EventId) -> Result<Vec<RegistrationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn set_attendance(
        &self,
        _registration_id: RegistrationId,
        _attended: bool,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn set_winner_position(
        &self,
        _user_id: UserId,
        _event_id: EventId,
        _position: WinnerPosition,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Debug)]
pub(super) struct BrokenPdf;

impl PdfRenderer for BrokenPdf {
    fn render(&self, _document: &PdfDocument) -> Result<Vec<u8>, PdfError> {
        Err(PdfError::Render("font table missing".to_string()))
    }
}

pub(super) type TestServices = AdminServices<MemoryStore, MemoryStore, MemoryStore, MemoryMailer>;

pub(super) fn build_services(
    store: &MemoryStore,
    mailer: &MemoryMailer,
    exporter: ExportGenerator,
) -> TestServices {
    let store = Arc::new(store.clone());
    AdminServices {
        attendance: Arc::new(AttendanceService::new(
            store.clone(),
            store.clone(),
            exporter,
        )),
        winners: Arc::new(WinnerAssignmentService::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(mailer.clone()),
            "Events Team",
        )),
    }
}

pub(super) fn router_with(store: &MemoryStore, mailer: &MemoryMailer) -> axum::Router {
    attendance_router(build_services(store, mailer, ExportGenerator::csv_only()))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) fn location(response: &Response) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect location")
        .to_string()
}
