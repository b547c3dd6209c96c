use super::super::domain::{
    AttendanceStatus, Event, RegistrationId, TeamMember, UserId, WinnerPosition,
};
use super::super::sorting::SortSpec;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceRating {
    Excellent,
    Good,
    Average,
    Poor,
}

impl AttendanceRating {
    /// Inclusive lower bounds, checked from the highest threshold down.
    pub const fn from_rate(rate: u8) -> Self {
        if rate >= 80 {
            Self::Excellent
        } else if rate >= 60 {
            Self::Good
        } else if rate >= 40 {
            Self::Average
        } else {
            Self::Poor
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationView {
    pub index: usize,
    pub registration_id: RegistrationId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub department: String,
    pub registration_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TeamMember>,
    pub registered_at: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_position: Option<WinnerPosition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceView {
    pub event: Event,
    pub sort: SortSpec,
    pub registrations: Vec<RegistrationView>,
    pub total: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub rate: u8,
    pub absent_rate: u8,
    pub rating: AttendanceRating,
    pub rating_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentStatEntry {
    pub department: String,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub rate: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRegistrationEntry {
    pub date: NaiveDate,
    /// Short axis label such as `Oct 03`.
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedReportView {
    #[serde(flatten)]
    pub overview: AttendanceView,
    pub department_stats: Vec<DepartmentStatEntry>,
    pub daily_registrations: Vec<DailyRegistrationEntry>,
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped_records: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}
