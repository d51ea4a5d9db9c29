//! Google Ads offline conversion sync
//!
//! Won leads that arrived through a paid click are reported back to Google
//! Ads as click conversions. [`ConversionSync`] owns the upload policy:
//! click id gating, the "not configured" state and interpretation of
//! partial failures. The network transport sits behind
//! [`ConversionUploader`] so it can be swapped in tests.

mod client;
mod credentials;

pub use client::*;
pub use credentials::*;

use crate::config::GoogleAdsConfig;
use crate::error::{Error, Result};
use crate::leads::Lead;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

const NOT_CONFIGURED: &str = "Google Ads API not configured";

/// One click conversion in the upload request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickConversion {
    pub gclid: String,
    pub conversion_action: String,
    pub conversion_date_time: String,
    pub conversion_value: f64,
    pub currency_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialFailureError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `uploadClickConversions`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Positional results; failed rows come back as empty objects
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub partial_failure_error: Option<PartialFailureError>,
}

/// Transport for click conversion uploads
#[async_trait]
pub trait ConversionUploader: Send + Sync {
    /// Upload a batch with partial failure mode enabled
    async fn upload_click_conversions(&self, conversions: &[ClickConversion])
        -> Result<UploadResponse>;

    /// Resource name of the conversion action conversions are attributed to
    fn conversion_action(&self) -> String;
}

/// The lead fields needed to report a conversion
#[derive(Debug, Clone, PartialEq)]
pub struct LeadForSync {
    pub id: String,
    pub gclid: Option<String>,
    pub conversion_value: Option<f64>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Lead> for LeadForSync {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id.clone(),
            gclid: lead.gclid().map(str::to_string),
            conversion_value: lead.conversion_value,
            converted_at: lead.converted_at,
            created_at: lead.created_at,
        }
    }
}

impl LeadForSync {
    fn usable_gclid(&self) -> Option<&str> {
        self.gclid.as_deref().filter(|g| !g.trim().is_empty())
    }
}

/// Outcome for one lead
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionUploadResult {
    pub success: bool,
    pub lead_id: String,
    pub gclid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub partial_failure: bool,
}

impl ConversionUploadResult {
    fn succeeded(lead_id: &str, gclid: &str) -> Self {
        Self {
            success: true,
            lead_id: lead_id.to_string(),
            gclid: gclid.to_string(),
            error: None,
            partial_failure: false,
        }
    }

    fn failed(lead_id: &str, gclid: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            lead_id: lead_id.to_string(),
            gclid: gclid.to_string(),
            error: Some(error.into()),
            partial_failure: false,
        }
    }

    fn partially_failed(lead_id: &str, gclid: &str, error: impl Into<String>) -> Self {
        Self {
            partial_failure: true,
            ..Self::failed(lead_id, gclid, error)
        }
    }
}

/// Outcome of a batch upload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConversionResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<ConversionUploadResult>,
    pub errors: Vec<String>,
}

impl BatchConversionResult {
    fn push(&mut self, result: ConversionUploadResult) {
        if result.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.results.push(result);
    }

    /// Ids of leads that were uploaded successfully
    pub fn succeeded_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.lead_id.clone())
            .collect()
    }
}

/// Google Ads wants `YYYY-MM-DD HH:MM:SS+00:00`
pub fn format_conversion_date_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S+00:00").to_string()
}

fn upstream_message(err: &Error) -> String {
    match err {
        Error::GoogleAds(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Conversion upload policy over an optional transport
#[derive(Clone)]
pub struct ConversionSync {
    uploader: Option<Arc<dyn ConversionUploader>>,
    currency: String,
}

impl ConversionSync {
    pub fn new(uploader: Arc<dyn ConversionUploader>, currency: impl Into<String>) -> Self {
        Self {
            uploader: Some(uploader),
            currency: currency.into(),
        }
    }

    /// A sync engine that reports itself as not configured
    pub fn disabled(currency: impl Into<String>) -> Self {
        Self {
            uploader: None,
            currency: currency.into(),
        }
    }

    /// Build from config, reading credentials from the environment
    pub fn from_config(config: &GoogleAdsConfig) -> Result<Self> {
        match GoogleAdsCredentials::from_env(config) {
            Some(credentials) => {
                info!(
                    customer_id = %credentials.customer_id,
                    "Google Ads conversion sync enabled"
                );
                let client = GoogleAdsClient::new(config, credentials)?;
                Ok(Self::new(Arc::new(client), config.currency.clone()))
            }
            None => {
                let missing =
                    GoogleAdsCredentials::missing_vars(config, |name| std::env::var(name).ok());
                info!(missing = ?missing, "Google Ads conversion sync disabled");
                Ok(Self::disabled(config.currency.clone()))
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.uploader.is_some()
    }

    /// Fail fast with [`Error::NotConfigured`] when credentials are missing
    pub fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::NotConfigured)
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    fn conversion_for(
        &self,
        uploader: &dyn ConversionUploader,
        lead: &LeadForSync,
        gclid: &str,
    ) -> ClickConversion {
        ClickConversion {
            gclid: gclid.to_string(),
            conversion_action: uploader.conversion_action(),
            conversion_date_time: format_conversion_date_time(
                &lead.converted_at.unwrap_or(lead.created_at),
            ),
            conversion_value: lead.conversion_value.unwrap_or(1.0),
            currency_code: self.currency.clone(),
        }
    }

    /// Upload a single lead's conversion
    pub async fn upload_one(&self, lead: &LeadForSync) -> ConversionUploadResult {
        let Some(gclid) = lead.usable_gclid() else {
            return ConversionUploadResult::failed(&lead.id, "", "Lead does not have a gclid");
        };
        let Some(uploader) = self.uploader.as_deref() else {
            return ConversionUploadResult::failed(&lead.id, gclid, NOT_CONFIGURED);
        };

        let conversion = self.conversion_for(uploader, lead, gclid);
        let response = match uploader.upload_click_conversions(&[conversion]).await {
            Ok(response) => response,
            Err(e) => {
                error!(lead_id = %lead.id, error = %e, "Error uploading conversion");
                return ConversionUploadResult::failed(&lead.id, gclid, upstream_message(&e));
            }
        };

        if let Some(failure) = response.partial_failure_error {
            let message = failure
                .message
                .unwrap_or_else(|| "Partial failure during upload".to_string());
            error!(lead_id = %lead.id, error = %message, "Partial failure uploading conversion");
            return ConversionUploadResult::partially_failed(&lead.id, gclid, message);
        }

        if response.results.is_empty() {
            return ConversionUploadResult::failed(&lead.id, gclid, "No results returned from API");
        }

        info!(lead_id = %lead.id, "Uploaded conversion");
        ConversionUploadResult::succeeded(&lead.id, gclid)
    }

    /// Upload many leads in a single request.
    ///
    /// Leads without a click id are left out entirely. Any partial failure
    /// fails every lead in the batch.
    pub async fn upload_batch(&self, leads: &[LeadForSync]) -> BatchConversionResult {
        let mut result = BatchConversionResult::default();

        let Some(uploader) = self.uploader.as_deref() else {
            result.errors.push(NOT_CONFIGURED.to_string());
            for lead in leads {
                result.push(ConversionUploadResult::failed(
                    &lead.id,
                    lead.gclid.as_deref().unwrap_or_default(),
                    NOT_CONFIGURED,
                ));
            }
            return result;
        };

        let valid: Vec<(&LeadForSync, &str)> = leads
            .iter()
            .filter_map(|lead| lead.usable_gclid().map(|gclid| (lead, gclid)))
            .collect();

        if valid.is_empty() {
            result
                .errors
                .push("No leads with valid gclid to upload".to_string());
            return result;
        }

        let conversions: Vec<ClickConversion> = valid
            .iter()
            .map(|(lead, gclid)| self.conversion_for(uploader, lead, gclid))
            .collect();

        let response = match uploader.upload_click_conversions(&conversions).await {
            Ok(response) => response,
            Err(e) => {
                let message = upstream_message(&e);
                error!(count = valid.len(), error = %message, "Error uploading batch conversions");
                result.errors.push(message.clone());
                for (lead, gclid) in &valid {
                    result.push(ConversionUploadResult::failed(&lead.id, gclid, message.clone()));
                }
                return result;
            }
        };

        if let Some(failure) = response.partial_failure_error {
            let message = failure
                .message
                .unwrap_or_else(|| "Conversion upload failed".to_string());
            error!(count = valid.len(), error = %message, "Partial failure in batch upload");
            result.errors.push(message.clone());
            for (lead, gclid) in &valid {
                result.push(ConversionUploadResult::partially_failed(
                    &lead.id,
                    gclid,
                    message.clone(),
                ));
            }
            return result;
        }

        if response.results.is_empty() {
            warn!("No results returned from Google Ads API");
            for (lead, gclid) in &valid {
                result.push(ConversionUploadResult::failed(
                    &lead.id,
                    gclid,
                    "No results returned from API",
                ));
            }
            return result;
        }

        for (index, (lead, gclid)) in valid.iter().enumerate() {
            if index < response.results.len() {
                result.push(ConversionUploadResult::succeeded(&lead.id, gclid));
            } else {
                result.push(ConversionUploadResult::failed(
                    &lead.id,
                    gclid,
                    "No result returned for this conversion",
                ));
            }
        }

        info!(
            success = result.success_count,
            failed = result.failure_count,
            "Uploaded batch conversions"
        );
        result
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingUploader;
    use super::*;

    fn lead(id: &str, gclid: Option<&str>) -> LeadForSync {
        LeadForSync {
            id: id.to_string(),
            gclid: gclid.map(str::to_string),
            conversion_value: None,
            converted_at: None,
            created_at: DateTime::parse_from_rfc3339("2026-01-15T10:30:00.250Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_conversion_time_format() {
        let at = DateTime::parse_from_rfc3339("2026-03-04T05:06:07.999+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_conversion_date_time(&at), "2026-03-04 03:06:07+00:00");
    }

    #[tokio::test]
    async fn test_upload_one_builds_conversion() {
        let uploader = RecordingUploader::accepting();
        let sync = ConversionSync::new(uploader.clone(), "USD");

        let mut won = lead("l1", Some("abc123"));
        won.conversion_value = Some(2500.0);
        won.converted_at = Some(
            DateTime::parse_from_rfc3339("2026-02-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );

        let result = sync.upload_one(&won).await;
        assert!(result.success);
        assert_eq!(result.gclid, "abc123");

        let calls = uploader.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            vec![ClickConversion {
                gclid: "abc123".into(),
                conversion_action: "customers/1234567890/conversionActions/987".into(),
                conversion_date_time: "2026-02-01 12:00:00+00:00".into(),
                conversion_value: 2500.0,
                currency_code: "USD".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_upload_one_defaults_value_and_time() {
        let uploader = RecordingUploader::accepting();
        let sync = ConversionSync::new(uploader.clone(), "CAD");

        assert!(sync.upload_one(&lead("l1", Some("g"))).await.success);
        let calls = uploader.calls.lock().unwrap();
        assert_eq!(calls[0][0].conversion_value, 1.0);
        assert_eq!(calls[0][0].conversion_date_time, "2026-01-15 10:30:00+00:00");
        assert_eq!(calls[0][0].currency_code, "CAD");
    }

    #[tokio::test]
    async fn test_upload_one_without_gclid_never_calls_api() {
        let uploader = RecordingUploader::accepting();
        let sync = ConversionSync::new(uploader.clone(), "USD");

        for gclid in [None, Some(""), Some("   ")] {
            let result = sync.upload_one(&lead("l1", gclid)).await;
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("Lead does not have a gclid"));
        }
        assert_eq!(uploader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_one_failures() {
        let sync = ConversionSync::disabled("USD");
        assert!(!sync.is_configured());
        assert!(matches!(sync.ensure_configured(), Err(Error::NotConfigured)));
        let result = sync.upload_one(&lead("l1", Some("g"))).await;
        assert_eq!(result.error.as_deref(), Some(NOT_CONFIGURED));

        let partial = RecordingUploader::new(|_| {
            Ok(UploadResponse {
                results: vec![serde_json::json!({})],
                partial_failure_error: Some(PartialFailureError {
                    code: Some(3),
                    message: Some("The imported gclid could not be decoded.".into()),
                }),
            })
        });
        let result = ConversionSync::new(partial, "USD")
            .upload_one(&lead("l1", Some("g")))
            .await;
        assert!(!result.success);
        assert!(result.partial_failure);
        assert_eq!(
            result.error.as_deref(),
            Some("The imported gclid could not be decoded.")
        );

        let empty = RecordingUploader::new(|_| Ok(UploadResponse::default()));
        let result = ConversionSync::new(empty, "USD")
            .upload_one(&lead("l1", Some("g")))
            .await;
        assert_eq!(result.error.as_deref(), Some("No results returned from API"));

        let broken = RecordingUploader::new(|_| Err(Error::GoogleAds("quota exceeded".into())));
        let result = ConversionSync::new(broken, "USD")
            .upload_one(&lead("l1", Some("g")))
            .await;
        assert_eq!(result.error.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_batch_skips_leads_without_gclid() {
        let uploader = RecordingUploader::accepting();
        let sync = ConversionSync::new(uploader.clone(), "USD");

        let result = sync
            .upload_batch(&[lead("a", Some("g1")), lead("b", None), lead("c", Some("g3"))])
            .await;

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 0);
        assert_eq!(result.succeeded_ids(), vec!["a".to_string(), "c".to_string()]);
        assert!(result.results.iter().all(|r| r.lead_id != "b"));
        assert_eq!(uploader.calls.lock().unwrap()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_batch_partial_failure_fails_everything() {
        let uploader = RecordingUploader::new(|_| {
            Ok(UploadResponse {
                results: vec![serde_json::json!({"gclid": "g1"}), serde_json::json!({})],
                partial_failure_error: Some(PartialFailureError {
                    code: Some(3),
                    message: Some("row 1 rejected".into()),
                }),
            })
        });
        let result = ConversionSync::new(uploader, "USD")
            .upload_batch(&[lead("a", Some("g1")), lead("b", Some("g2"))])
            .await;

        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.errors, vec!["row 1 rejected".to_string()]);
        assert!(result.results.iter().all(|r| r.partial_failure));
    }

    #[tokio::test]
    async fn test_batch_missing_positional_result() {
        let uploader = RecordingUploader::new(|_| {
            Ok(UploadResponse {
                results: vec![serde_json::json!({"gclid": "g1"})],
                partial_failure_error: None,
            })
        });
        let result = ConversionSync::new(uploader, "USD")
            .upload_batch(&[lead("a", Some("g1")), lead("b", Some("g2"))])
            .await;

        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 1);
        assert_eq!(
            result.results[1].error.as_deref(),
            Some("No result returned for this conversion")
        );
    }

    #[tokio::test]
    async fn test_batch_edge_cases() {
        let result = ConversionSync::disabled("USD")
            .upload_batch(&[lead("a", Some("g1")), lead("b", None)])
            .await;
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.errors, vec![NOT_CONFIGURED.to_string()]);

        let uploader = RecordingUploader::accepting();
        let result = ConversionSync::new(uploader.clone(), "USD")
            .upload_batch(&[lead("b", None)])
            .await;
        assert_eq!(result.success_count + result.failure_count, 0);
        assert_eq!(
            result.errors,
            vec!["No leads with valid gclid to upload".to_string()]
        );
        assert_eq!(uploader.call_count(), 0);

        let broken = RecordingUploader::new(|_| Err(Error::GoogleAds("unavailable".into())));
        let result = ConversionSync::new(broken, "USD")
            .upload_batch(&[lead("a", Some("g1")), lead("c", Some("g3"))])
            .await;
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.errors, vec!["unavailable".to_string()]);
    }
}
