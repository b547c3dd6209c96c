use event_admin::workflows::attendance::{
    Event, EventId, EventStore, RegistrationId, RegistrationRecord, RegistrationStatus,
    RegistrationStore, RepositoryError, RosterImport, SortSpec, User, UserDirectory, UserId,
    WinnerPosition,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreData {
    events: BTreeMap<EventId, Event>,
    registrations: Vec<RegistrationRecord>,
    users: HashMap<UserId, User>,
}

/// Process-local registrations, events and users behind one lock, so winner and
/// attendance updates are serialized per request.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEventAdminStore {
    data: Arc<Mutex<StoreData>>,
}

impl InMemoryEventAdminStore {
    pub(crate) fn from_import(import: RosterImport) -> Self {
        let (events, registrations) = import.into_parts();
        let mut data = StoreData::default();
        for record in &registrations {
            data.users
                .entry(record.user.id)
                .or_insert_with(|| record.user.clone());
        }
        data.events = events.into_iter().map(|event| (event.id, event)).collect();
        data.registrations = registrations;
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub(crate) fn registration_count(&self) -> usize {
        self.data
            .lock()
            .expect("store mutex poisoned")
            .registrations
            .len()
    }
}

impl RegistrationStore for InMemoryEventAdminStore {
    fn approved_by_event(
        &self,
        event_id: EventId,
        sort: SortSpec,
    ) -> Result<Vec<RegistrationRecord>, RepositoryError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        let mut records: Vec<RegistrationRecord> = guard
            .registrations
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
        let guard = self.data.lock().expect("store mutex poisoned");
        let mut records: Vec<RegistrationRecord> = guard
            .registrations
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
        let mut guard = self.data.lock().expect("store mutex poisoned");
        let record = guard
            .registrations
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
        let mut guard = self.data.lock().expect("store mutex poisoned");
        let mut updated = 0;
        for record in guard.registrations.iter_mut().filter(|record| {
            record.registration.user_id == user_id && record.registration.event_id == event_id
        }) {
            record.registration.winner_position = Some(position);
            updated += 1;
        }

        if updated == 0 {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }
}

impl EventStore for InMemoryEventAdminStore {
    fn get(&self, event_id: EventId) -> Result<Option<Event>, RepositoryError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(guard.events.get(&event_id).cloned())
    }

    fn all(&self) -> Result<Vec<Event>, RepositoryError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        let mut events: Vec<Event> = guard.events.values().cloned().collect();
        events.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.time.cmp(&a.time)));
        Ok(events)
    }
}

impl UserDirectory for InMemoryEventAdminStore {
    fn find(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(guard.users.get(&user_id).cloned())
    }
}
