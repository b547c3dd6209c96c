use super::common::*;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Request, StatusCode};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use tower::ServiceExt;

use crate::workflows::attendance::domain::RegistrationId;
use crate::workflows::attendance::export::{
    ExportGenerator, PdfDocument, PdfError, PdfRenderer, TextPdfRenderer,
};
use crate::workflows::attendance::router::{winner_form, EXPORT_WARNING_HEADER};
use crate::workflows::attendance::{
    AdminServices, AttendanceService, FlashMessage, WinnerAssignmentService,
};

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn attendance_view_normalizes_sort_parameters() {
    let store = MemoryStore::seeded(roster());
    let router = router_with(&store, &MemoryMailer::default());

    let response = router
        .oneshot(get("/admin/attendance?event_id=42&sort=bogus&order=DOWN"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["sort"]["key"], "name");
    assert_eq!(body["sort"]["order"], "asc");
    assert_eq!(body["total"], 5);
    assert_eq!(body["present_count"], 2);
    assert_eq!(body["absent_count"], 3);
    assert_eq!(body["rate"], 40);
    assert_eq!(body["rating"], "average");
    assert_eq!(body["registrations"][0]["name"], "Arjun Mehta");
    assert!(body.get("flash").is_none());
}

#[tokio::test]
async fn missing_or_unknown_event_redirects_with_flash() {
    let store = MemoryStore::seeded(roster());
    let mailer = MemoryMailer::default();

    let response = router_with(&store, &mailer)
        .oneshot(get("/admin/attendance?event_id=abc"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin/events?flash=invalid_event&level=danger"
    );

    let response = router_with(&store, &mailer)
        .oneshot(get("/admin/attendance/export?event_id=9&format=csv"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin/events?flash=event_not_found&level=danger"
    );

    let response = router_with(&store, &mailer)
        .oneshot(get("/admin/attendance/report"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn flash_parameter_is_rendered_on_pages() {
    let store = MemoryStore::seeded(roster());
    let response = router_with(&store, &MemoryMailer::default())
        .oneshot(get("/admin/events?flash=event_not_found&level=danger"))
        .await
        .expect("response");

    let body = read_json_body(response).await;
    assert_eq!(body["events"][0]["title"], "Robotics Cup");
    assert_eq!(body["pdf_export"], false);
    assert_eq!(body["flash"]["code"], "event_not_found");
    assert_eq!(body["flash"]["level"], "danger");
    assert_eq!(body["flash"]["text"], FlashMessage::EventNotFound.text());
}

#[tokio::test]
async fn report_includes_breakdowns() {
    let store = MemoryStore::seeded(roster());
    let response = router_with(&store, &MemoryMailer::default())
        .oneshot(get("/admin/attendance/report?event_id=42"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["department_stats"][0]["department"], "CSE");
    assert_eq!(body["department_stats"][0]["total"], 3);
    assert_eq!(body["daily_registrations"][2]["label"], "Oct 03");
    assert_eq!(body["daily_registrations"][2]["count"], 2);
}

#[tokio::test]
async fn pdf_export_without_renderer_sets_warning_header() {
    let store = MemoryStore::seeded(roster());
    let response = router_with(&store, &MemoryMailer::default())
        .oneshot(get("/admin/attendance/export?event_id=42&format=pdf&sort=date&order=desc"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"attendance_robotics_cup_2024-10-12.csv\""
    );
    assert!(headers.contains_key(EXPORT_WARNING_HEADER));

    let body = String::from_utf8(read_body(response).await).expect("utf8 csv");
    let first_row = body.lines().nth(1).expect("data row");
    assert!(first_row.starts_with("1,Zoe Park,"));
}

#[tokio::test]
async fn pdf_export_with_renderer_streams_pdf() {
    let store = MemoryStore::seeded(roster());
    let services = build_services(
        &store,
        &MemoryMailer::default(),
        ExportGenerator::with_builtin_pdf(),
    );
    let response = crate::workflows::attendance::attendance_router(services)
        .oneshot(get("/admin/attendance/export?event_id=42&format=pdf"))
        .await
        .expect("response");

    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(!response.headers().contains_key(EXPORT_WARNING_HEADER));
    assert!(read_body(response).await.starts_with(b"%PDF-1.4"));
}

/// Remembers which thread each render ran on.
#[derive(Debug, Default)]
struct ThreadRecordingPdf {
    threads: Mutex<Vec<ThreadId>>,
}

impl PdfRenderer for ThreadRecordingPdf {
    fn render(&self, document: &PdfDocument) -> Result<Vec<u8>, PdfError> {
        self.threads
            .lock()
            .expect("renderer mutex poisoned")
            .push(thread::current().id());
        TextPdfRenderer::default().render(document)
    }
}

#[tokio::test]
async fn pdf_export_renders_off_the_request_thread() {
    let store = MemoryStore::seeded(roster());
    let renderer = Arc::new(ThreadRecordingPdf::default());
    let services = build_services(
        &store,
        &MemoryMailer::default(),
        ExportGenerator::new(Some(renderer.clone() as Arc<dyn PdfRenderer>)),
    );

    let response = crate::workflows::attendance::attendance_router(services)
        .oneshot(get("/admin/attendance/export?event_id=42&format=pdf"))
        .await
        .expect("response");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");

    let threads = renderer.threads.lock().expect("renderer mutex poisoned").clone();
    assert_eq!(threads.len(), 1);
    assert_ne!(threads[0], thread::current().id());
}

#[tokio::test]
async fn marking_attendance_updates_store_and_redirects() {
    let store = MemoryStore::seeded(roster());
    let response = router_with(&store, &MemoryMailer::default())
        .oneshot(post_form(
            "/admin/attendance",
            "registration_id=3&event_id=42&attended=on",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin/attendance?event_id=42&flash=attendance_updated&level=success"
    );
    let record = store.registration(RegistrationId(3)).expect("registration");
    assert!(record.registration.checked_in);

    let response = router_with(&store, &MemoryMailer::default())
        .oneshot(post_form(
            "/admin/attendance",
            "registration_id=77&event_id=42",
        ))
        .await
        .expect("response");
    assert_eq!(
        location(&response),
        "/admin/attendance?event_id=42&flash=attendance_update_failed&level=warning"
    );
}

#[tokio::test]
async fn winner_submission_redirects_with_notification_count() {
    let store = MemoryStore::seeded(roster());
    let mailer = MemoryMailer::default();
    let response = router_with(&store, &mailer)
        .oneshot(post_form(
            "/admin/winners",
            "eventId=42&position%5B101%5D=1st&position%5B102%5D=&position%5B103%5D=3rd",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin/winners?event_id=42&success=true&notifications=2"
    );
    assert_eq!(mailer.sent().len(), 2);

    let response = router_with(&store, &mailer)
        .oneshot(get("/admin/winners?event_id=42&success=true&notifications=2"))
        .await
        .expect("response");
    let body = read_json_body(response).await;
    assert_eq!(body["saved"], true);
    assert_eq!(body["notifications_sent"], 2);
    assert_eq!(body["board"]["winners_count"], 2);
}

#[tokio::test]
async fn winner_submission_for_unknown_event_redirects() {
    let store = MemoryStore::seeded(roster());
    let response = router_with(&store, &MemoryMailer::default())
        .oneshot(post_form("/admin/winners", "eventId=5&position%5B101%5D=1st"))
        .await
        .expect("response");

    assert_eq!(
        location(&response),
        "/admin/events?flash=event_not_found&level=danger"
    );
    assert!(store.positions().is_empty());
}

#[tokio::test]
async fn repository_outage_returns_json_error() {
    let store = Arc::new(UnavailableStore);
    let events = Arc::new(MemoryStore::seeded(roster()));
    let services = AdminServices {
        attendance: Arc::new(AttendanceService::new(
            store.clone(),
            events.clone(),
            ExportGenerator::csv_only(),
        )),
        winners: Arc::new(WinnerAssignmentService::new(
            store,
            events.clone(),
            events,
            Arc::new(MemoryMailer::default()),
            "Events Team",
        )),
    };

    let response = crate::workflows::attendance::router::attendance_handler(
        State(services),
        Query(serde_json::from_value(serde_json::json!({ "event_id": "42" })).expect("query")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("database offline"));
}

#[test]
fn winner_form_keeps_position_fields_in_order() {
    let (event_id, entries) = winner_form(vec![
        ("position[12]".to_string(), "2nd".to_string()),
        ("eventId".to_string(), "42".to_string()),
        ("csrf".to_string(), "token".to_string()),
        ("position[7]".to_string(), "1st".to_string()),
    ]);

    assert_eq!(event_id, Some(EVENT));
    let users: Vec<&str> = entries.iter().map(|entry| entry.user_id.as_str()).collect();
    assert_eq!(users, vec!["12", "7"]);
    assert_eq!(entries[0].position, "2nd");
}

#[test]
fn flash_codes_round_trip() {
    for message in FlashMessage::ordered() {
        assert_eq!(FlashMessage::from_code(message.code()), Some(message));
    }
    assert_eq!(FlashMessage::from_code("nope"), None);
}
