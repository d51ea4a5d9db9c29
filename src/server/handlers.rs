//! Route handlers

use super::auth::AdminIdentity;
use super::response::contact_failure;
use super::AppState;
use crate::admin::{self, ExportParams, LeadListParams, LeadUpdateRequest, SyncRequest};
use crate::attribution::{AttributionData, RequestContext};
use crate::error::{Error, Result};
use crate::leads::NewLead;
use crate::notify::LeadEmailData;
use crate::validation::{validate_lead_form, LeadFormInput};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::{header, Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, error, info};

const CONTACT_SUCCESS_MESSAGE: &str = "Thank you! We'll be in touch within 1 business day.";

/// Contact form payload: form fields plus attribution captured in the browser
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSubmission {
    #[serde(flatten)]
    pub form: LeadFormInput,
    #[serde(flatten)]
    pub attribution: AttributionData,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn request_context(headers: &HeaderMap, extensions: &Extensions) -> RequestContext {
    RequestContext::from_headers(
        header_str(headers, header::USER_AGENT.as_str()),
        header_str(headers, "x-forwarded-for"),
        header_str(headers, "x-real-ip"),
        peer_ip(extensions),
    )
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        debug!(error = %rejection, "Rejected request body");
        Error::InvalidRequest("Invalid request body".to_string())
    })
}

/// `POST /api/contact`
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    extensions: Extensions,
    headers: HeaderMap,
    body: std::result::Result<Json<ContactSubmission>, JsonRejection>,
) -> Response {
    let client = state
        .limiter
        .client_key(header_str(&headers, "x-forwarded-for"), peer_ip(&extensions));
    if !state.limiter.check(client.as_deref()) {
        return Error::RateLimited.into_response();
    }

    let context = request_context(&headers, &extensions);

    let submission = match json_body(body) {
        Ok(submission) => submission,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": "Invalid request body" })),
            )
                .into_response()
        }
    };

    let form = match validate_lead_form(&submission.form) {
        Ok(form) => form,
        Err(errors) => {
            debug!(fields = %errors, "Contact form validation failed");
            return Error::Validation(errors).into_response();
        }
    };

    let lead = match state
        .store
        .insert(NewLead::new(form, submission.attribution, context))
        .await
    {
        Ok(lead) => lead,
        Err(e) => {
            error!(error = %e, "Failed to save lead");
            return contact_failure(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    info!(
        lead_id = %lead.id,
        utm_source = ?lead.attribution.utm_source,
        has_gclid = lead.gclid().is_some(),
        "Lead captured"
    );

    let outcome = state
        .notifier
        .send_lead_emails(&LeadEmailData::from(&lead))
        .await;
    debug!(
        lead_id = %lead.id,
        notification = outcome.client_notification.success,
        confirmation = outcome.lead_confirmation.success,
        "Lead emails dispatched"
    );

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": CONTACT_SUCCESS_MESSAGE,
            "leadId": lead.id,
        })),
    )
        .into_response()
}

/// `GET /api/admin/leads`
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadListParams>,
) -> Result<Response> {
    let list = admin::list_leads(&state.store, &params, state.settings.per_page).await?;
    Ok(Json(list).into_response())
}

/// `PATCH /api/admin/leads`
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AdminIdentity>,
    body: std::result::Result<Json<LeadUpdateRequest>, JsonRejection>,
) -> Result<Response> {
    let request = json_body(body)?;
    let result = admin::update_lead(&state.store, &state.sync, request, Some(&identity.email)).await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncStatusParams {
    #[serde(default)]
    pub stats: Option<String>,
}

/// `GET /api/admin/conversions/sync`
pub async fn sync_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SyncStatusParams>,
) -> Result<Response> {
    let include_stats = params.stats.as_deref() == Some("true");
    let status = admin::sync_status(&state.store, &state.sync, include_stats).await?;
    Ok(Json(status).into_response())
}

/// `POST /api/admin/conversions/sync`
pub async fn sync_conversions(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AdminIdentity>,
    body: std::result::Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Response> {
    // Not-configured takes precedence over a malformed body
    state.sync.ensure_configured()?;
    let request = json_body(body)?;
    info!(operator = %identity.email, "Manual conversion sync requested");

    let response = admin::sync_conversions(
        &state.store,
        &state.sync,
        &request,
        state.settings.sync_all_limit,
    )
    .await?;

    let status = if response.is_upload_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)).into_response())
}

/// `GET /api/admin/conversions/export`
pub async fn export_conversions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> Result<Response> {
    let export = admin::export_conversions(
        &state.store,
        &params,
        &state.settings.conversion_name,
        &state.settings.currency,
    )
    .await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
        (
            header::CACHE_CONTROL,
            "no-cache, no-store, must-revalidate".to_string(),
        ),
    ];
    Ok((headers, export.body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_contact_submission_reads_form_and_attribution() {
        let submission: ContactSubmission = serde_json::from_value(json!({
            "name": "Jo Li",
            "practiceName": "Li Clinic",
            "email": "JO@X.COM",
            "phone": "555-123-4567",
            "utm_source": "google",
            "gclid": "abc123",
            "landing_page": "https://example.com/?gclid=abc123",
            "referrer": ""
        }))
        .unwrap();

        assert_eq!(submission.form.practice_name.as_deref(), Some("Li Clinic"));
        assert_eq!(submission.attribution.gclid.as_deref(), Some("abc123"));
        assert_eq!(submission.attribution.utm_source.as_deref(), Some("google"));
        assert_eq!(submission.attribution.referrer.as_deref(), Some(""));
    }

    #[test]
    fn test_request_context_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert(header::USER_AGENT, "Mozilla/5.0".parse().unwrap());
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            4000,
        )));

        let context = request_context(&headers, &extensions);
        assert_eq!(context.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(context.user_agent.as_deref(), Some("Mozilla/5.0"));

        let context = request_context(&HeaderMap::new(), &extensions);
        assert_eq!(context.ip_address.as_deref(), Some("127.0.0.1"));
    }
}
