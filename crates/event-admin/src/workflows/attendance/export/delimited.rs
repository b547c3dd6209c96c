use super::super::domain::{Event, RegistrationRecord};
use super::ExportError;

pub(crate) const HEADER: [&str; 6] = [
    "#",
    "Participant Name",
    "Email",
    "Registration Type",
    "Registration Date",
    "Attendance Status",
];

pub(crate) const DATE_FORMAT: &str = "%b %d, %Y";

/// Field values for one exported row, shared by the CSV and PDF layouts.
pub(crate) fn row_fields(index: usize, event: &Event, record: &RegistrationRecord) -> [String; 6] {
    [
        (index + 1).to_string(),
        record.user.name.clone(),
        record.user.email.clone(),
        record.registration_type(event),
        record
            .registration
            .created_at
            .format(DATE_FORMAT)
            .to_string(),
        record.attendance().label().to_string(),
    ]
}

pub(crate) fn render(event: &Event, records: &[RegistrationRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for (index, record) in records.iter().enumerate() {
        writer.write_record(row_fields(index, event, record))?;
    }

    writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))
}
