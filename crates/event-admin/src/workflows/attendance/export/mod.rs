mod delimited;
pub mod pdf;

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Event, RegistrationRecord};
use super::report::AttendanceSummary;
pub use pdf::{PdfDocument, PdfError, PdfLine, PdfRenderer, TextPdfRenderer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Pdf,
}

impl ExportFormat {
    /// Case-insensitive; anything other than `pdf` exports CSV.
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case("pdf") => Self::Pdf,
            _ => Self::Csv,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> mime::Mime {
        match self {
            Self::Csv => mime::TEXT_CSV_UTF_8,
            Self::Pdf => mime::APPLICATION_PDF,
        }
    }
}

/// Downloadable output of an export request.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub content_type: mime::Mime,
    pub filename: String,
    /// Format actually produced, which differs from the request after a fallback.
    pub format: ExportFormat,
    pub fallback: bool,
    pub warning: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export buffer: {0}")]
    Flush(String),
}

pub const PDF_UNAVAILABLE_WARNING: &str = "PDF library not found. Falling back to CSV format.";
pub const PDF_FAILED_WARNING: &str = "PDF rendering failed. Falling back to CSV format.";

/// Renders attendance lists. PDF support is decided once when the generator is built.
#[derive(Debug, Clone, Default)]
pub struct ExportGenerator {
    pdf: Option<Arc<dyn PdfRenderer>>,
}

impl ExportGenerator {
    pub fn new(pdf: Option<Arc<dyn PdfRenderer>>) -> Self {
        Self { pdf }
    }

    pub fn csv_only() -> Self {
        Self { pdf: None }
    }

    pub fn with_builtin_pdf() -> Self {
        Self::new(Some(Arc::new(TextPdfRenderer::default())))
    }

    pub fn pdf_available(&self) -> bool {
        self.pdf.is_some()
    }

    pub fn export(
        &self,
        event: &Event,
        records: &[RegistrationRecord],
        requested: ExportFormat,
    ) -> Result<ExportArtifact, ExportError> {
        if requested == ExportFormat::Pdf {
            match &self.pdf {
                Some(renderer) => match renderer.render(&pdf_document(event, records)) {
                    Ok(bytes) => {
                        info!(event_id = %event.id, rows = records.len(), "rendered attendance PDF");
                        return Ok(self.artifact(event, bytes, ExportFormat::Pdf, None));
                    }
                    Err(err) => {
                        warn!(event_id = %event.id, error = %err, "PDF export failed, using CSV");
                        return self.csv_artifact(event, records, Some(PDF_FAILED_WARNING));
                    }
                },
                None => {
                    warn!(event_id = %event.id, "PDF export unavailable, using CSV");
                    return self.csv_artifact(event, records, Some(PDF_UNAVAILABLE_WARNING));
                }
            }
        }

        self.csv_artifact(event, records, None)
    }

    fn csv_artifact(
        &self,
        event: &Event,
        records: &[RegistrationRecord],
        warning: Option<&str>,
    ) -> Result<ExportArtifact, ExportError> {
        let bytes = delimited::render(event, records)?;
        info!(event_id = %event.id, rows = records.len(), "rendered attendance CSV");
        Ok(self.artifact(event, bytes, ExportFormat::Csv, warning))
    }

    fn artifact(
        &self,
        event: &Event,
        bytes: Vec<u8>,
        format: ExportFormat,
        warning: Option<&str>,
    ) -> ExportArtifact {
        ExportArtifact {
            bytes,
            content_type: format.content_type(),
            filename: export_filename(event, format),
            format,
            fallback: warning.is_some(),
            warning: warning.map(str::to_string),
        }
    }
}

/// `attendance_<title-slug>_<event-date>.<ext>`
pub fn export_filename(event: &Event, format: ExportFormat) -> String {
    let mut slug = String::with_capacity(event.title.len());
    for ch in event.title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    let slug = if slug.is_empty() {
        format!("event_{}", event.id)
    } else {
        slug.to_string()
    };

    format!(
        "attendance_{slug}_{}.{}",
        event.date.format("%Y-%m-%d"),
        format.extension()
    )
}

const COLUMN_WIDTHS: [usize; 6] = [4, 28, 34, 28, 14, 10];

fn pdf_document(event: &Event, records: &[RegistrationRecord]) -> PdfDocument {
    let summary = AttendanceSummary::from_records(records);
    let mut lines = vec![
        PdfLine::plain(format!(
            "Date: {}   Time: {}",
            event.date.format(delimited::DATE_FORMAT),
            event.time.format("%I:%M %p")
        )),
        PdfLine::plain(format!("Venue: {} (Room: {})", event.venue, event.room)),
        PdfLine::plain(format!(
            "Category: {}   Registration Type: {}   Maximum Participants: {}",
            event.category,
            event.registration_type_label(),
            event.max_participants
        )),
        PdfLine::blank(),
        PdfLine::bold(format!(
            "Total Registered: {}   Present: {} ({}%)   Absent: {} ({}%)   Rating: {}",
            summary.total,
            summary.present,
            summary.rate,
            summary.absent,
            summary.absent_rate(),
            summary.rating().label()
        )),
        PdfLine::blank(),
        PdfLine::bold(table_row(delimited::HEADER.map(str::to_string))),
        PdfLine::plain("-".repeat(COLUMN_WIDTHS.iter().sum::<usize>() + COLUMN_WIDTHS.len())),
    ];

    lines.extend(
        records
            .iter()
            .enumerate()
            .map(|(index, record)| PdfLine::plain(table_row(delimited::row_fields(index, event, record)))),
    );

    if records.is_empty() {
        lines.push(PdfLine::plain("No approved registrations found for this event."));
    }

    PdfDocument {
        title: format!("Attendance Report: {}", event.title),
        lines,
    }
}

fn table_row(cells: [String; 6]) -> String {
    cells
        .iter()
        .zip(COLUMN_WIDTHS)
        .map(|(cell, width)| fit(cell, width))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

fn fit(value: &str, width: usize) -> String {
    let count = value.chars().count();
    if count > width {
        let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
        clipped.push('~');
        clipped
    } else {
        format!("{value:<width$}")
    }
}
