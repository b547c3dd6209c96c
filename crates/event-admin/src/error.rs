use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::attendance::{ExportError, MailError, RosterImportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("roster import error: {0}")]
    Roster(#[from] RosterImportError),
    #[error("mail setup error: {0}")]
    Mail(#[from] MailError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Roster(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Mail(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_errors_map_to_bad_request() {
        let err = AppError::from(RosterImportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing roster",
        )));
        assert!(err.to_string().starts_with("roster import error"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn wrapped_errors_keep_their_source() {
        use std::error::Error as _;

        let err = AppError::from(ExportError::Flush("disk full".to_string()));
        assert_eq!(err.to_string(), "export error: failed to flush export buffer: disk full");
        assert!(err.source().is_some());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let missing = AppError::NotFound("event 9".to_string());
        assert!(missing.source().is_none());
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}
