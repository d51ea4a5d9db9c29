//! Mapping of crate errors to HTTP responses

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Shown to form submitters on any failure; upstream text is never exposed
pub const CONTACT_FAILURE_MESSAGE: &str =
    "Failed to save your information. Please try again or call us directly.";

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::LeadNotFound(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Admin-facing rendering. Operators are trusted, so upstream error text is
/// passed through.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Error::Validation(errors) => json!({ "success": false, "errors": errors }),
            Error::InvalidRequest(message) | Error::Conflict(message) | Error::NotFound(message) => {
                json!({ "error": message })
            }
            Error::LeadNotFound(_) => json!({ "error": "Lead not found" }),
            Error::Unauthorized => json!({ "error": "Unauthorized" }),
            Error::RateLimited => json!({ "success": false, "error": CONTACT_FAILURE_MESSAGE }),
            Error::NotConfigured => json!({
                "error": "Google Ads API not configured",
                "message": "Set GOOGLE_ADS_* environment variables to enable sync.",
            }),
            other => {
                error!(error = %other, "Request failed");
                json!({ "error": "Internal server error", "details": other.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Public contact endpoint rendering with the generic failure message
pub fn contact_failure(status: StatusCode) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": CONTACT_FAILURE_MESSAGE })),
    )
        .into_response()
}
