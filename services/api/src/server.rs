use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryEventAdminStore};
use crate::routes::with_admin_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use event_admin::config::AppConfig;
use event_admin::error::AppError;
use event_admin::telemetry;
use event_admin::workflows::attendance::{
    AdminServices, AttendanceService, ConfiguredMailer, ExportGenerator, RosterImporter,
    WinnerAssignmentService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = match &config.roster_csv {
        Some(path) => {
            let import = RosterImporter::from_path(path)?;
            let skipped = import.errors().count();
            if skipped > 0 {
                warn!(path = %path.display(), skipped, "roster rows could not be imported");
            }
            InMemoryEventAdminStore::from_import(import)
        }
        None => InMemoryEventAdminStore::default(),
    };
    info!(registrations = store.registration_count(), "registration store seeded");
    let store = Arc::new(store);

    let exporter = if config.export.pdf_enabled {
        ExportGenerator::with_builtin_pdf()
    } else {
        ExportGenerator::csv_only()
    };
    let mailer = Arc::new(ConfiguredMailer::from_config(&config.mail)?);

    let services = AdminServices {
        attendance: Arc::new(AttendanceService::new(
            store.clone(),
            store.clone(),
            exporter,
        )),
        winners: Arc::new(WinnerAssignmentService::new(
            store.clone(),
            store.clone(),
            store,
            mailer,
            config.mail.from_name.clone(),
        )),
    };

    let app = with_admin_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        pdf_export = config.export.pdf_enabled,
        mail_transport = ?config.mail.transport,
        "event admin service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
