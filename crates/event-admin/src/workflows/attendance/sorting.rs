use super::domain::RegistrationRecord;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Email,
    Date,
    Attendance,
}

impl SortKey {
    /// Exact, case-sensitive match against the allow-list.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "date" => Some(Self::Date),
            "attendance" => Some(Self::Attendance),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Date => "date",
            Self::Attendance => "attendance",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The order a column header toggles to when clicked again.
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Validated ordering for registration listings and exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub const fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Normalize untrusted sort parameters. Unknown values fall back to `name` / `asc`.
    pub fn resolve(key: Option<&str>, order: Option<&str>) -> Self {
        Self {
            key: key.and_then(SortKey::parse).unwrap_or_default(),
            order: order.and_then(SortOrder::parse).unwrap_or_default(),
        }
    }

    pub fn compare(&self, a: &RegistrationRecord, b: &RegistrationRecord) -> Ordering {
        let ordering = match self.key {
            SortKey::Name => compare_text(&a.user.name, &b.user.name),
            SortKey::Email => compare_text(&a.user.email, &b.user.email),
            SortKey::Date => a
                .registration
                .created_at
                .cmp(&b.registration.created_at),
            SortKey::Attendance => a
                .registration
                .checked_in
                .cmp(&b.registration.checked_in),
        };

        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Stable sort, so equal keys keep the store's order.
    pub fn sort(&self, records: &mut [RegistrationRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
