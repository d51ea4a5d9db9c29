//! Manual conversion sync entry points

use crate::error::{Error, Result};
use crate::gads::{BatchConversionResult, ConversionSync, ConversionUploadResult, LeadForSync};
use crate::leads::{Lead, LeadFilter, LeadQuery, LeadSort, LeadStore, SyncStats};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Body of `POST /api/admin/conversions/sync`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub lead_ids: Option<Vec<String>>,
    #[serde(default)]
    pub sync_all: bool,
    #[serde(default)]
    pub force: bool,
}

/// Which leads a sync request targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    One { lead_id: String, force: bool },
    Many(Vec<String>),
    AllPending,
}

impl SyncRequest {
    pub fn target(&self) -> Result<SyncTarget> {
        if let Some(lead_id) = self.lead_id.as_deref().filter(|id| !id.trim().is_empty()) {
            return Ok(SyncTarget::One {
                lead_id: lead_id.trim().to_string(),
                force: self.force,
            });
        }
        if let Some(ids) = self.lead_ids.as_ref().filter(|ids| !ids.is_empty()) {
            return Ok(SyncTarget::Many(ids.clone()));
        }
        if self.sync_all {
            return Ok(SyncTarget::AllPending);
        }
        Err(Error::InvalidRequest(
            "Provide leadId, leadIds, or syncAll parameter.".to_string(),
        ))
    }
}

/// Body of `GET /api/admin/conversions/sync`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub configured: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SyncStats>,
}

/// Whether sync is configured, with counts when asked for
pub async fn sync_status(
    store: &LeadStore,
    sync: &ConversionSync,
    include_stats: bool,
) -> Result<SyncStatus> {
    if !sync.is_configured() {
        return Ok(SyncStatus {
            configured: false,
            message: "Google Ads API credentials not configured. Set GOOGLE_ADS_* environment variables."
                .to_string(),
            stats: None,
        });
    }

    let stats = if include_stats {
        Some(store.sync_stats().await?)
    } else {
        None
    };

    Ok(SyncStatus {
        configured: true,
        message: "Google Ads API is configured and ready".to_string(),
        stats,
    })
}

/// Result of a manual sync.
///
/// Single-lead syncs carry `result`; batch syncs flatten the batch counts
/// into the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ConversionUploadResult>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchConversionResult>,
}

impl SyncResponse {
    /// A single-lead upload that the platform rejected
    pub fn is_upload_failure(&self) -> bool {
        !self.success && self.result.is_some()
    }

    fn for_batch(message: String, batch: BatchConversionResult) -> Self {
        Self {
            success: batch.failure_count == 0,
            message: Some(message),
            error: None,
            result: None,
            batch: Some(batch),
        }
    }
}

/// Dispatch a sync request to the matching entry point
pub async fn sync_conversions(
    store: &LeadStore,
    sync: &ConversionSync,
    request: &SyncRequest,
    sync_all_limit: u32,
) -> Result<SyncResponse> {
    sync.ensure_configured()?;
    match request.target()? {
        SyncTarget::One { lead_id, force } => sync_single(store, sync, &lead_id, force).await,
        SyncTarget::Many(ids) => sync_many(store, sync, ids).await,
        SyncTarget::AllPending => sync_all_pending(store, sync, sync_all_limit).await,
    }
}

/// Upload one lead's conversion, refusing to re-upload unless forced
pub async fn sync_single(
    store: &LeadStore,
    sync: &ConversionSync,
    lead_id: &str,
    force: bool,
) -> Result<SyncResponse> {
    sync.ensure_configured()?;

    let lead = store.get(lead_id).await?;
    if lead.gclid().is_none() {
        return Err(Error::InvalidRequest("Lead does not have a gclid".to_string()));
    }
    if lead.gads_conversion_sent && !force {
        return Err(Error::Conflict(
            "Conversion already synced. Use force=true to re-sync.".to_string(),
        ));
    }

    let result = sync.upload_one(&LeadForSync::from(&lead)).await;
    if !result.success {
        return Ok(SyncResponse {
            success: false,
            message: None,
            error: result.error.clone(),
            result: Some(result),
            batch: None,
        });
    }

    store
        .mark_conversions_sent(&[lead.id.clone()], Utc::now())
        .await?;
    info!(lead_id = %lead.id, forced = force, "Conversion synced");

    Ok(SyncResponse {
        success: true,
        message: Some("Conversion synced to Google Ads".to_string()),
        error: None,
        result: Some(result),
        batch: None,
    })
}

/// Upload the listed leads that carry a click id
pub async fn sync_many(
    store: &LeadStore,
    sync: &ConversionSync,
    lead_ids: Vec<String>,
) -> Result<SyncResponse> {
    sync.ensure_configured()?;

    let query = LeadQuery::new()
        .filter(LeadFilter::Ids(lead_ids))
        .filter(LeadFilter::HasGclid);
    let leads = store.list(&query).await?;
    if leads.is_empty() {
        return Err(Error::NotFound("No valid leads found".to_string()));
    }

    upload_and_record(store, sync, &leads).await
}

/// Upload the oldest pending conversions, at most `limit` per call
pub async fn sync_all_pending(
    store: &LeadStore,
    sync: &ConversionSync,
    limit: u32,
) -> Result<SyncResponse> {
    sync.ensure_configured()?;

    let query = LeadQuery::new()
        .filters(LeadFilter::pending_sync())
        .sort(LeadSort::oldest_first())
        .limit(limit);
    let leads = store.list(&query).await?;
    if leads.is_empty() {
        return Ok(SyncResponse::for_batch(
            "No pending conversions to sync".to_string(),
            BatchConversionResult::default(),
        ));
    }

    upload_and_record(store, sync, &leads).await
}

async fn upload_and_record(
    store: &LeadStore,
    sync: &ConversionSync,
    leads: &[Lead],
) -> Result<SyncResponse> {
    let batch_input: Vec<LeadForSync> = leads.iter().map(LeadForSync::from).collect();
    let batch = sync.upload_batch(&batch_input).await;

    let succeeded = batch.succeeded_ids();
    if let Err(e) = store.mark_conversions_sent(&succeeded, Utc::now()).await {
        error!(count = succeeded.len(), error = %e, "Conversions uploaded but sync state was not saved");
        return Err(e);
    }

    let message = format!(
        "Synced {} of {} conversions",
        batch.success_count,
        leads.len()
    );
    info!(
        success = batch.success_count,
        failed = batch.failure_count,
        "Batch conversion sync finished"
    );
    Ok(SyncResponse::for_batch(message, batch))
}
