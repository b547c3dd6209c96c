use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Parse a user-supplied identifier, rejecting anything non-numeric.
            pub fn parse(raw: &str) -> Option<Self> {
                raw.trim().parse::<u64>().ok().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a schedulable event.
    EventId
);
numeric_id!(
    /// Identifier of a person in the user directory.
    UserId
);
numeric_id!(
    /// Identifier of one enrollment row.
    RegistrationId
);

/// Award ranking assigned after an event concludes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WinnerPosition {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
}

impl WinnerPosition {
    pub const fn ordered() -> [Self; 3] {
        [Self::First, Self::Second, Self::Third]
    }

    /// Accepts exactly `1st`, `2nd` or `3rd`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "1st" => Some(Self::First),
            "2nd" => Some(Self::Second),
            "3rd" => Some(Self::Third),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "1st Place",
            Self::Second => "2nd Place",
            Self::Third => "3rd Place",
        }
    }

    pub const fn color(self) -> &'static str {
        match self {
            Self::First => "#FFD700",
            Self::Second => "#C0C0C0",
            Self::Third => "#CD7F32",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::First => "🏆",
            Self::Second => "🥈",
            Self::Third => "🥉",
        }
    }

    pub const fn css_class(self) -> &'static str {
        match self {
            Self::First => "first-place",
            Self::Second => "second-place",
            Self::Third => "third-place",
        }
    }
}

impl fmt::Display for WinnerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation state of a registration. Only approved rows count toward attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub const fn from_check_in(checked_in: bool) -> Self {
        if checked_in {
            Self::Present
        } else {
            Self::Absent
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub venue: String,
    pub room: String,
    pub category: String,
    pub team_based: bool,
    pub max_participants: u32,
}

impl Event {
    pub const fn registration_type_label(&self) -> &'static str {
        if self.team_based {
            "Team-based"
        } else {
            "Individual"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub reg_no: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TeamMember>,
    pub checked_in: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_position: Option<WinnerPosition>,
}

/// A registration joined with the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub registration: Registration,
    pub user: User,
}

impl RegistrationRecord {
    pub const fn attendance(&self) -> AttendanceStatus {
        AttendanceStatus::from_check_in(self.registration.checked_in)
    }

    /// `Team: <name>` for team-based events with a team, otherwise `Individual`.
    pub fn registration_type(&self, event: &Event) -> String {
        match (event.team_based, self.registration.team_name.as_deref()) {
            (true, Some(team)) if !team.trim().is_empty() => format!("Team: {team}"),
            _ => "Individual".to_string(),
        }
    }

    /// Department bucket label, `Unknown` when the user has none.
    pub fn department(&self) -> &str {
        self.user
            .department
            .as_deref()
            .map(str::trim)
            .filter(|department| !department.is_empty())
            .unwrap_or(UNKNOWN_DEPARTMENT)
    }
}

pub const UNKNOWN_DEPARTMENT: &str = "Unknown";
