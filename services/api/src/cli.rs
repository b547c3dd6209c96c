use crate::reports::{run_attendance_export, run_attendance_report, ExportArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use event_admin::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "event-admin",
    about = "Serve or script the event attendance and winner administration workflows",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Attendance reporting against a CSV roster
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AttendanceCommand {
    /// Print attendance totals, department breakdown and the registration list
    Report(ReportArgs),
    /// Write the attendance list for one event as CSV or PDF
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Attendance {
            command: AttendanceCommand::Report(args),
        } => run_attendance_report(args),
        Command::Attendance {
            command: AttendanceCommand::Export(args),
        } => run_attendance_export(args),
    }
}
