//! Lead status updates
//!
//! An update is a sequence of independent store calls: read the current
//! status, write the patch (with an extended history when the status
//! changes), then optionally upload the conversion and record the sync.
//! Nothing spans the whole sequence; a failed upload never undoes the
//! status change.

use crate::error::{Error, Result};
use crate::gads::{ConversionSync, LeadForSync};
use crate::history::append_transition;
use crate::leads::{Lead, LeadPatch, LeadStatus, LeadStore};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

/// Distinguish an absent field from an explicit `null`
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PATCH /api/admin/leads`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadUpdateRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub conversion_value: Option<Option<f64>>,
}

/// Auto-sync outcome returned next to the updated lead
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoSyncStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl AutoSyncStatus {
    fn synced() -> Self {
        Self {
            success: Some(true),
            skipped: None,
            error: None,
            message: "Conversion automatically synced to Google Ads".to_string(),
        }
    }

    fn failed(error: Option<String>) -> Self {
        Self {
            success: Some(false),
            skipped: None,
            error,
            message: "Failed to sync conversion to Google Ads".to_string(),
        }
    }

    fn not_configured() -> Self {
        Self {
            success: None,
            skipped: Some(true),
            error: None,
            message: "Google Ads API not configured".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdateResult {
    pub lead: Lead,
    pub google_ads_sync: Option<AutoSyncStatus>,
}

/// Apply an operator's edit to a lead.
///
/// `actor` is recorded as `changed_by` on any new history entry. Moving to
/// `won` refreshes `converted_at` and, for an unsynced lead with a click id,
/// uploads the conversion.
pub async fn update_lead(
    store: &LeadStore,
    sync: &ConversionSync,
    request: LeadUpdateRequest,
    actor: Option<&str>,
) -> Result<LeadUpdateResult> {
    let id = request
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidRequest("Lead ID is required".to_string()))?;

    let status = request
        .status
        .as_deref()
        .map(str::parse::<LeadStatus>)
        .transpose()?;

    let now = Utc::now();
    let mut patch = LeadPatch {
        status,
        notes: request.notes,
        conversion_value: request.conversion_value,
        ..Default::default()
    };

    if let Some(new_status) = status {
        let current = store.get(id).await?;
        patch.status_history = append_transition(
            current.status,
            &current.status_history,
            new_status,
            now,
            actor,
        );
        if new_status == LeadStatus::Won {
            patch.converted_at = Some(now);
        }
    }

    let lead = store.update(id, &patch).await?;
    if patch.status_history.is_some() {
        info!(lead_id = %id, status = ?status, actor = ?actor, "Lead status changed");
    }

    let should_sync =
        status == Some(LeadStatus::Won) && lead.gclid().is_some() && !lead.gads_conversion_sent;
    if !should_sync {
        return Ok(LeadUpdateResult {
            lead,
            google_ads_sync: None,
        });
    }

    if !sync.is_configured() {
        return Ok(LeadUpdateResult {
            lead,
            google_ads_sync: Some(AutoSyncStatus::not_configured()),
        });
    }

    let result = sync.upload_one(&LeadForSync::from(&lead)).await;
    if !result.success {
        return Ok(LeadUpdateResult {
            lead,
            google_ads_sync: Some(AutoSyncStatus::failed(result.error)),
        });
    }

    let recorded = store
        .update(
            id,
            &LeadPatch {
                conversion_sent_at: Some(Some(Utc::now())),
                ..Default::default()
            },
        )
        .await;
    let lead = match recorded {
        Ok(lead) => lead,
        Err(e) => {
            error!(lead_id = %id, error = %e, "Conversion uploaded but sync state was not saved");
            lead
        }
    };

    Ok(LeadUpdateResult {
        lead,
        google_ads_sync: Some(AutoSyncStatus::synced()),
    })
}
