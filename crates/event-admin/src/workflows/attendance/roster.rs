//! CSV roster import used to seed stores and drive offline reports.
//!
//! Each row is one registration joined with its user and event. Rows that fail
//! to decode are kept as [`RecordError`]s next to the good ones, so reporting can
//! skip them without discarding the rest of the file.

use super::domain::{
    Event, EventId, Registration, RegistrationId, RegistrationRecord, RegistrationStatus,
    TeamMember, User, UserId, WinnerPosition,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// A single roster row that could not be turned into a registration.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: team members are not a JSON list of {{name, reg_no}}")]
    InvalidMembers {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed roster row: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// A failed row plus the event it names, when the `event_id` cell was readable.
#[derive(Debug)]
pub struct RejectedRow {
    pub event_id: Option<EventId>,
    pub error: RecordError,
}

#[derive(Debug, Default)]
pub struct RosterImport {
    pub events: BTreeMap<EventId, Event>,
    pub rows: Vec<Result<RegistrationRecord, RejectedRow>>,
}

impl RosterImport {
    pub fn event(&self, event_id: EventId) -> Option<&Event> {
        self.events.get(&event_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &RegistrationRecord> {
        self.rows.iter().filter_map(|row| row.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &RecordError> {
        self.rows
            .iter()
            .filter_map(|row| row.as_ref().err().map(|rejected| &rejected.error))
    }

    /// Failed rows whose event could not be recovered, so no report owns them.
    pub fn unattributed_errors(&self) -> impl Iterator<Item = &RecordError> {
        self.rows.iter().filter_map(|row| match row {
            Err(rejected) if rejected.event_id.is_none() => Some(&rejected.error),
            _ => None,
        })
    }

    /// Approved rows for one event, with that event's decode failures passed through.
    pub fn approved_rows(
        &self,
        event_id: EventId,
    ) -> impl Iterator<Item = Result<&RegistrationRecord, &RecordError>> {
        self.rows.iter().filter_map(move |row| match row {
            Ok(record)
                if record.registration.event_id == event_id
                    && record.registration.status == RegistrationStatus::Approved =>
            {
                Some(Ok(record))
            }
            Ok(_) => None,
            Err(rejected) if rejected.event_id == Some(event_id) => Some(Err(&rejected.error)),
            Err(_) => None,
        })
    }

    pub fn into_parts(self) -> (Vec<Event>, Vec<RegistrationRecord>) {
        let records = self.rows.into_iter().filter_map(Result::ok).collect();
        (self.events.into_values().collect(), records)
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RosterImport, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<RosterImport, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let event_column = headers.iter().position(|name| name == "event_id");
        let mut import = RosterImport::default();

        for result in csv_reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    import.rows.push(Err(RejectedRow {
                        event_id: None,
                        error: err.into(),
                    }));
                    continue;
                }
            };

            let line = record.position().map_or(0, |position| position.line());
            let raw_event = event_column
                .and_then(|index| record.get(index))
                .and_then(EventId::parse);
            let decoded = record
                .deserialize::<RosterRow>(Some(&headers))
                .map_err(RecordError::from)
                .and_then(|row| row.into_parts(line));

            match decoded {
                Ok((event, registration)) => {
                    import.events.entry(event.id).or_insert(event);
                    import.rows.push(Ok(registration));
                }
                Err(error) => import.rows.push(Err(RejectedRow {
                    event_id: raw_event,
                    error,
                })),
            }
        }

        Ok(import)
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    registration_id: u64,
    event_id: u64,
    event_title: String,
    event_date: String,
    #[serde(default)]
    event_time: String,
    #[serde(default)]
    venue: String,
    #[serde(default)]
    room: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    team_based: String,
    #[serde(default)]
    max_participants: Option<u32>,
    user_id: u64,
    user_name: String,
    user_email: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    team_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    members: Option<String>,
    #[serde(default)]
    check_in: String,
    created_at: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    winner_position: Option<String>,
}

impl RosterRow {
    fn into_parts(self, line: u64) -> Result<(Event, RegistrationRecord), RecordError> {
        let invalid = |field: &'static str, value: &str| RecordError::InvalidField {
            line,
            field,
            value: value.to_string(),
        };

        let date = NaiveDate::parse_from_str(&self.event_date, "%Y-%m-%d")
            .map_err(|_| invalid("event_date", &self.event_date))?;
        let time = parse_time(&self.event_time)
            .ok_or_else(|| invalid("event_time", &self.event_time))?;
        let team_based = parse_bool(&self.team_based)
            .ok_or_else(|| invalid("team_based", &self.team_based))?;
        let checked_in =
            parse_bool(&self.check_in).ok_or_else(|| invalid("check_in", &self.check_in))?;
        let created_at = parse_timestamp(&self.created_at)
            .ok_or_else(|| invalid("created_at", &self.created_at))?;

        let status = match self.status.as_deref() {
            None => RegistrationStatus::Approved,
            Some(raw) => RegistrationStatus::parse(raw).ok_or_else(|| invalid("status", raw))?,
        };
        let winner_position = match self.winner_position.as_deref() {
            None => None,
            Some(raw) => Some(
                WinnerPosition::parse(raw).ok_or_else(|| invalid("winner_position", raw))?,
            ),
        };
        let members = match self.members.as_deref() {
            None => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<TeamMember>>(raw)
                .map_err(|source| RecordError::InvalidMembers { line, source })?,
        };

        let event = Event {
            id: EventId(self.event_id),
            title: self.event_title,
            date,
            time,
            venue: self.venue,
            room: self.room,
            category: self.category,
            team_based,
            max_participants: self.max_participants.unwrap_or_default(),
        };

        let record = RegistrationRecord {
            registration: Registration {
                id: RegistrationId(self.registration_id),
                event_id: event.id,
                user_id: UserId(self.user_id),
                status,
                team_name: self.team_name,
                members,
                checked_in,
                created_at,
                winner_position,
            },
            user: User {
                id: UserId(self.user_id),
                name: self.user_name,
                email: self.user_email,
                department: self.department,
            },
        };

        Ok((event, record))
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Check-in style flags; an empty cell means "no".
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "n" => Some(false),
        "1" | "true" | "yes" | "y" => Some(true),
        _ => None,
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(NaiveTime::MIN);
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}

/// RFC 3339 timestamps are converted to UTC; naive timestamps are taken as UTC already.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "registration_id,event_id,event_title,event_date,event_time,venue,room,category,team_based,max_participants,user_id,user_name,user_email,department,status,team_name,members,check_in,created_at,winner_position";

    fn import(rows: &[&str]) -> RosterImport {
        let mut input = String::from(HEADER);
        for row in rows {
            input.push('\n');
            input.push_str(row);
        }
        RosterImporter::from_reader(input.as_bytes()).expect("roster parses")
    }

    #[test]
    fn decodes_joined_row_with_team_members() {
        let roster = import(&[
            r#"3,7,Code Sprint,2024-11-08,10:00,Lab,L-2,Technical,yes,60,13,Zoe Park,zoe@example.edu,CSE,,Null Pointers,"[{""name"":""Ravi"",""reg_no"":""21CS044""}]",1,2024-10-30T08:00:00+05:30,2nd"#,
        ]);

        let record = roster.records().next().expect("one record");
        assert_eq!(record.registration.status, RegistrationStatus::Approved);
        assert_eq!(record.registration.team_name.as_deref(), Some("Null Pointers"));
        assert_eq!(record.registration.members.len(), 1);
        assert_eq!(record.registration.members[0].reg_no, "21CS044");
        assert!(record.registration.checked_in);
        assert_eq!(record.registration.winner_position, Some(WinnerPosition::Second));
        assert_eq!(
            record.registration.created_at.to_rfc3339(),
            "2024-10-30T02:30:00+00:00"
        );

        let event = roster.event(EventId(7)).expect("event registered");
        assert!(event.team_based);
        assert_eq!(event.max_participants, 60);
    }

    #[test]
    fn bad_rows_are_kept_as_errors_with_line_numbers() {
        let roster = import(&[
            "1,7,Code Sprint,2024-11-08,,,,,no,,11,Priya,priya@example.edu,,,,,0,2024-10-28,",
            "2,7,Code Sprint,2024-11-08,,,,,no,,12,Arjun,arjun@example.edu,,,,,maybe,2024-10-28,",
            "3,7,Code Sprint,2024-11-08,,,,,no,,13,Zoe,zoe@example.edu,,,,,1,2024-10-28,4th",
        ]);

        assert_eq!(roster.records().count(), 1);
        let errors: Vec<String> = roster.errors().map(ToString::to_string).collect();
        assert_eq!(
            errors,
            vec![
                "line 3: invalid check_in 'maybe'".to_string(),
                "line 4: invalid winner_position '4th'".to_string(),
            ]
        );
    }

    #[test]
    fn approved_rows_filter_by_event_and_status_but_pass_errors_through() {
        let roster = import(&[
            "1,7,Code Sprint,2024-11-08,,,,,no,,11,Priya,priya@example.edu,,approved,,,1,2024-10-28,",
            "2,7,Code Sprint,2024-11-08,,,,,no,,12,Arjun,arjun@example.edu,,pending,,,0,2024-10-28,",
            "3,9,Poster Walk,2024-11-15,,,,,no,,13,Zoe,zoe@example.edu,,approved,,,0,2024-10-28,",
            "4,7,Code Sprint,2024-11-08,,,,,no,,14,Liam,liam@example.edu,,approved,,,0,yesterday,",
        ]);

        let rows: Vec<_> = roster.approved_rows(EventId(7)).collect();
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], Ok(record) if record.registration.id == RegistrationId(1)));
        assert!(rows[1].is_err());

        let other: Vec<_> = roster.approved_rows(EventId(9)).collect();
        assert_eq!(other.len(), 1);
        assert!(other[0].is_ok());
    }

    #[test]
    fn failed_rows_stay_with_the_event_they_name() {
        let roster = import(&[
            "1,9,Poster Walk,2024-11-15,,,,,no,,11,Priya,priya@example.edu,,,,,1,2024-11-01,",
            "abc,9,Poster Walk,2024-11-15,,,,,no,,12,Arjun,arjun@example.edu,,,,,0,2024-11-01,",
            "3,7,Code Sprint,2024-11-08,,,,,no,,13,Zoe,zoe@example.edu,,,,,maybe,2024-10-28,",
            "4,seven,Code Sprint,2024-11-08,,,,,no,,14,Liam,liam@example.edu,,,,,0,2024-10-28,",
        ]);

        assert_eq!(roster.errors().count(), 3);

        let for_nine: Vec<_> = roster.approved_rows(EventId(9)).collect();
        assert_eq!(for_nine.len(), 2);
        assert!(matches!(for_nine[1], Err(RecordError::Csv(_))));

        let for_seven: Vec<_> = roster.approved_rows(EventId(7)).collect();
        assert_eq!(for_seven.len(), 1);
        assert!(matches!(
            for_seven[0],
            Err(RecordError::InvalidField { field: "check_in", .. })
        ));

        assert_eq!(roster.unattributed_errors().count(), 1);
    }

    #[test]
    fn timestamps_are_normalised_to_utc() {
        let naive = parse_timestamp("2024-10-28 18:40:00").expect("naive timestamp");
        assert_eq!(naive.to_rfc3339(), "2024-10-28T18:40:00+00:00");

        let date_only = parse_timestamp("2024-10-30").expect("date only");
        assert_eq!(date_only.to_rfc3339(), "2024-10-30T00:00:00+00:00");

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
    }
}
