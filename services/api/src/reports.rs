use clap::Args;
use event_admin::error::AppError;
use event_admin::workflows::attendance::{
    AttendanceSummary, DetailedReportView, EventId, ExportFormat, ExportGenerator,
    RegistrationRecord, RosterImport, RosterImporter, SortSpec,
};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// CSV roster with one registration per row
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Event to report on
    #[arg(long)]
    pub(crate) event_id: u64,
    /// Sort column: name, email, date or attendance
    #[arg(long)]
    pub(crate) sort: Option<String>,
    /// Sort direction: asc or desc
    #[arg(long)]
    pub(crate) order: Option<String>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// CSV roster with one registration per row
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Event to export
    #[arg(long)]
    pub(crate) event_id: u64,
    /// Output format: csv or pdf
    #[arg(long, default_value = "csv")]
    pub(crate) format: String,
    /// Destination file (defaults to the generated filename in the working directory)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Sort column: name, email, date or attendance
    #[arg(long)]
    pub(crate) sort: Option<String>,
    /// Sort direction: asc or desc
    #[arg(long)]
    pub(crate) order: Option<String>,
    /// Disable the built-in PDF renderer
    #[arg(long)]
    pub(crate) no_pdf: bool,
}

pub(crate) fn run_attendance_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        roster,
        event_id,
        sort,
        order,
        json,
    } = args;

    let import = RosterImporter::from_path(&roster)?;
    let event_id = EventId(event_id);
    let sort = SortSpec::resolve(sort.as_deref(), order.as_deref());
    let Some(event) = import.event(event_id) else {
        return Err(missing_event(event_id, &roster));
    };
    let records = approved_records(&import, event_id, sort);

    let summary = AttendanceSummary::from_rows(import.approved_rows(event_id));
    let view = summary.detailed(event, &records, sort);
    let unattributed = import.unattributed_errors().count();

    if json {
        match serde_json::to_string_pretty(&view) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Report payload unavailable: {err}"),
        }
    } else {
        render_report(&view);
    }
    if unattributed > 0 {
        let note = format!(
            "{unattributed} malformed roster rows have no readable event id and are not counted here"
        );
        if json {
            eprintln!("{note}");
        } else {
            println!("{note}");
        }
    }

    Ok(())
}

pub(crate) fn run_attendance_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        roster,
        event_id,
        format,
        output,
        sort,
        order,
        no_pdf,
    } = args;

    let import = RosterImporter::from_path(&roster)?;
    let event_id = EventId(event_id);
    let sort = SortSpec::resolve(sort.as_deref(), order.as_deref());
    let Some(event) = import.event(event_id) else {
        return Err(missing_event(event_id, &roster));
    };
    let records = approved_records(&import, event_id, sort);

    let generator = if no_pdf {
        ExportGenerator::csv_only()
    } else {
        ExportGenerator::with_builtin_pdf()
    };
    let artifact = generator.export(event, &records, ExportFormat::resolve(Some(&format)))?;

    let path = output.unwrap_or_else(|| PathBuf::from(&artifact.filename));
    std::fs::write(&path, &artifact.bytes)?;

    if let Some(warning) = &artifact.warning {
        println!("Warning: {warning}");
    }
    println!(
        "Wrote {} rows for '{}' to {} ({})",
        records.len(),
        event.title,
        path.display(),
        artifact.content_type
    );

    Ok(())
}

fn missing_event(event_id: EventId, roster: &Path) -> AppError {
    AppError::NotFound(format!(
        "event {event_id} is not present in {}",
        roster.display()
    ))
}

fn approved_records(
    import: &RosterImport,
    event_id: EventId,
    sort: SortSpec,
) -> Vec<RegistrationRecord> {
    let mut records: Vec<RegistrationRecord> = import
        .approved_rows(event_id)
        .filter_map(Result::ok)
        .cloned()
        .collect();
    sort.sort(&mut records);
    records
}

fn render_report(view: &DetailedReportView) {
    let overview = &view.overview;
    let event = &overview.event;

    println!("Attendance report: {}", event.title);
    println!(
        "{} {} | {} (Room: {}) | {} | {}",
        event.date.format("%b %d, %Y"),
        event.time.format("%I:%M %p"),
        event.venue,
        event.room,
        event.category,
        event.registration_type_label()
    );
    println!(
        "\nRegistered {} | Present {} ({}%) | Absent {} ({}%) | Rating {}",
        overview.total,
        overview.present_count,
        overview.rate,
        overview.absent_count,
        overview.absent_rate,
        overview.rating_label
    );
    if view.skipped_records > 0 {
        println!("Skipped {} malformed roster rows", view.skipped_records);
    }

    if view.department_stats.is_empty() {
        println!("\nDepartments: none");
    } else {
        println!("\nDepartments");
        for entry in &view.department_stats {
            println!(
                "- {}: {} registered | {} present | {} absent | {}%",
                entry.department, entry.total, entry.present, entry.absent, entry.rate
            );
        }
    }

    if !view.daily_registrations.is_empty() {
        println!("\nRegistrations per day");
        for entry in &view.daily_registrations {
            println!("- {}: {}", entry.label, entry.count);
        }
    }

    println!(
        "\nParticipants (sorted by {} {})",
        overview.sort.key.as_str(),
        overview.sort.order.as_str()
    );
    for row in &overview.registrations {
        let winner = row
            .winner_position
            .map(|position| format!(" | {} {}", position.label(), position.icon()))
            .unwrap_or_default();
        println!(
            "{:>3}. {} <{}> | {} | {} | {}{}",
            row.index,
            row.name,
            row.email,
            row.department,
            row.registration_type,
            row.status_label,
            winner
        );
    }
}
