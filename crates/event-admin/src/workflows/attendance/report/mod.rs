mod summary;
pub mod views;

pub use summary::{attendance_rate, AttendanceSummary, DepartmentTally};
pub use views::{
    AttendanceRating, AttendanceView, DailyRegistrationEntry, DepartmentStatEntry,
    DetailedReportView, RegistrationView,
};
