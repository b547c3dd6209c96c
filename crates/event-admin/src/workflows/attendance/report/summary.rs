use super::super::domain::{Event, RegistrationRecord};
use super::super::roster::RecordError;
use super::super::sorting::SortSpec;
use super::views::{
    AttendanceRating, AttendanceView, DailyRegistrationEntry, DepartmentStatEntry,
    DetailedReportView, RegistrationView,
};
use chrono::NaiveDate;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DepartmentTally {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
}

impl DepartmentTally {
    pub fn rate(&self) -> u8 {
        attendance_rate(self.present, self.total)
    }
}

/// Immutable statistics over one event's approved registrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub rate: u8,
    /// Sorted by total descending; equal totals keep first-seen order.
    pub departments: Vec<(String, DepartmentTally)>,
    /// Keyed by UTC calendar date of registration.
    pub daily_registrations: BTreeMap<NaiveDate, usize>,
    pub skipped: usize,
}

#[derive(Default)]
struct Accumulator {
    total: usize,
    present: usize,
    departments: Vec<(String, DepartmentTally)>,
    department_index: HashMap<String, usize>,
    daily: BTreeMap<NaiveDate, usize>,
    skipped: usize,
}

impl Accumulator {
    fn record(mut self, record: &RegistrationRecord) -> Self {
        let checked_in = record.registration.checked_in;
        self.total += 1;
        if checked_in {
            self.present += 1;
        }

        let department = record.department();
        let slot = match self.department_index.get(department) {
            Some(&slot) => slot,
            None => {
                self.departments
                    .push((department.to_string(), DepartmentTally::default()));
                let slot = self.departments.len() - 1;
                self.department_index.insert(department.to_string(), slot);
                slot
            }
        };
        let tally = &mut self.departments[slot].1;
        tally.total += 1;
        if checked_in {
            tally.present += 1;
        } else {
            tally.absent += 1;
        }

        *self
            .daily
            .entry(record.registration.created_at.date_naive())
            .or_default() += 1;

        self
    }

    fn finish(self) -> AttendanceSummary {
        let Accumulator {
            total,
            present,
            mut departments,
            daily,
            skipped,
            ..
        } = self;

        departments.sort_by(|a, b| b.1.total.cmp(&a.1.total));

        AttendanceSummary {
            total,
            present,
            absent: total - present,
            rate: attendance_rate(present, total),
            departments,
            daily_registrations: daily,
            skipped,
        }
    }
}

impl AttendanceSummary {
    pub fn from_records<I, R>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Borrow<RegistrationRecord>,
    {
        records
            .into_iter()
            .fold(Accumulator::default(), |acc, record| {
                acc.record(record.borrow())
            })
            .finish()
    }

    /// Aggregate rows that may have failed to decode; failures are logged and skipped.
    pub fn from_rows<I, R, E>(rows: I) -> Self
    where
        I: IntoIterator<Item = Result<R, E>>,
        R: Borrow<RegistrationRecord>,
        E: Borrow<RecordError>,
    {
        rows.into_iter()
            .fold(Accumulator::default(), |mut acc, row| match row {
                Ok(record) => acc.record(record.borrow()),
                Err(err) => {
                    let err: &RecordError = err.borrow();
                    warn!(error = %err, "skipping malformed registration record");
                    acc.skipped += 1;
                    acc
                }
            })
            .finish()
    }

    pub fn rating(&self) -> AttendanceRating {
        AttendanceRating::from_rate(self.rate)
    }

    pub fn absent_rate(&self) -> u8 {
        if self.total > 0 {
            100 - self.rate
        } else {
            0
        }
    }

    pub fn overview(
        &self,
        event: &Event,
        records: &[RegistrationRecord],
        sort: SortSpec,
    ) -> AttendanceView {
        let registrations = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let status = record.attendance();
                RegistrationView {
                    index: index + 1,
                    registration_id: record.registration.id,
                    user_id: record.user.id,
                    name: record.user.name.clone(),
                    email: record.user.email.clone(),
                    department: record.department().to_string(),
                    registration_type: record.registration_type(event),
                    members: record.registration.members.clone(),
                    registered_at: record.registration.created_at,
                    status,
                    status_label: status.label(),
                    winner_position: record.registration.winner_position,
                }
            })
            .collect();

        let rating = self.rating();
        AttendanceView {
            event: event.clone(),
            sort,
            registrations,
            total: self.total,
            present_count: self.present,
            absent_count: self.absent,
            rate: self.rate,
            absent_rate: self.absent_rate(),
            rating,
            rating_label: rating.label(),
        }
    }

    pub fn detailed(
        &self,
        event: &Event,
        records: &[RegistrationRecord],
        sort: SortSpec,
    ) -> DetailedReportView {
        let department_stats = self
            .departments
            .iter()
            .map(|(department, tally)| DepartmentStatEntry {
                department: department.clone(),
                total: tally.total,
                present: tally.present,
                absent: tally.absent,
                rate: tally.rate(),
            })
            .collect();

        let daily_registrations = self
            .daily_registrations
            .iter()
            .map(|(date, count)| DailyRegistrationEntry {
                date: *date,
                label: date.format("%b %d").to_string(),
                count: *count,
            })
            .collect();

        DetailedReportView {
            overview: self.overview(event, records, sort),
            department_stats,
            daily_registrations,
            skipped_records: self.skipped,
        }
    }
}

/// Present share as a whole percentage, rounded half away from zero; 0 for an empty set.
pub fn attendance_rate(present: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (present as f64 / total as f64) * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}
