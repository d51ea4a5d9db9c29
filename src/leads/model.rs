//! Lead record types

use crate::attribution::{AttributionData, RequestContext};
use crate::error::{Error, Result};
use crate::validation::LeadFormData;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Pipeline status of a lead
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    ProposalSent,
    Won,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::ProposalSent,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::ProposalSent => "proposal_sent",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidRequest(format!("Unknown lead status: {}", s)))
    }
}

/// One entry of a lead's append-only status audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: LeadStatus,
    pub changed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
}

/// A captured lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub name: String,
    pub practice_name: String,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub project_type: Option<String>,

    pub status: LeadStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub notes: Option<String>,
    pub conversion_value: Option<f64>,
    pub converted_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub attribution: AttributionData,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,

    pub gads_conversion_sent: bool,
    pub gads_conversion_sent_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Click identifier usable for offline conversion upload
    pub fn gclid(&self) -> Option<&str> {
        self.attribution
            .gclid
            .as_deref()
            .filter(|g| !g.trim().is_empty())
    }

    /// Timestamp reported as the conversion time
    pub fn conversion_time(&self) -> DateTime<Utc> {
        self.converted_at.unwrap_or(self.created_at)
    }

    /// Conversion value reported upstream, defaulting to 1
    pub fn effective_conversion_value(&self) -> f64 {
        self.conversion_value.unwrap_or(1.0)
    }
}

/// Everything needed to insert a lead from a public submission
#[derive(Debug, Clone)]
pub struct NewLead {
    pub form: LeadFormData,
    pub attribution: AttributionData,
    pub context: RequestContext,
}

impl NewLead {
    pub fn new(form: LeadFormData, attribution: AttributionData, context: RequestContext) -> Self {
        Self {
            form,
            attribution: attribution.normalized(),
            context,
        }
    }

    pub(crate) fn into_lead(self, now: DateTime<Utc>) -> Lead {
        Lead {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            name: self.form.name,
            practice_name: self.form.practice_name,
            email: self.form.email,
            phone: self.form.phone,
            website: self.form.website,
            project_type: self.form.project_type.map(|p| p.as_str().to_string()),
            status: LeadStatus::New,
            status_history: Vec::new(),
            notes: None,
            conversion_value: None,
            converted_at: None,
            attribution: self.attribution,
            user_agent: self.context.user_agent,
            ip_address: self.context.ip_address,
            gads_conversion_sent: false,
            gads_conversion_sent_at: None,
        }
    }
}

/// Partial update applied by [`super::LeadStore::update`].
///
/// `None` leaves a column untouched. For nullable columns `Some(None)` clears.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPatch {
    pub status: Option<LeadStatus>,
    pub status_history: Option<Vec<StatusHistoryEntry>>,
    pub notes: Option<Option<String>>,
    pub conversion_value: Option<Option<f64>>,
    pub converted_at: Option<DateTime<Utc>>,
    /// Writes both sync columns: `Some(Some(t))` marks sent at `t`,
    /// `Some(None)` marks not sent
    pub conversion_sent_at: Option<Option<DateTime<Utc>>>,
}

/// Fixed-width RFC 3339 so stored timestamps order lexicographically
pub fn db_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: &str, column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::CorruptRecord {
            id: id.to_string(),
            reason: format!("{}: {}", column, e),
        })
}

/// Raw `leads` row
#[derive(Debug, Clone, FromRow)]
pub(crate) struct LeadRow {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub name: String,
    pub practice_name: String,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub project_type: Option<String>,
    pub status: String,
    pub status_history_json: Option<String>,
    pub notes: Option<String>,
    pub conversion_value: Option<f64>,
    pub converted_at: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
    pub msclkid: Option<String>,
    pub ttclid: Option<String>,
    pub li_fat_id: Option<String>,
    pub landing_page: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub gads_conversion_sent: bool,
    pub gads_conversion_sent_at: Option<String>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = Error;

    fn try_from(row: LeadRow) -> Result<Self> {
        let id = row.id;
        let status = row.status.parse().map_err(|_| Error::CorruptRecord {
            id: id.clone(),
            reason: format!("status: {}", row.status),
        })?;
        let status_history = match row.status_history_json.as_deref() {
            None | Some("") => Vec::new(),
            Some(json) => serde_json::from_str(json).map_err(|e| Error::CorruptRecord {
                id: id.clone(),
                reason: format!("status_history: {}", e),
            })?,
        };
        let optional_ts = |column: &str, raw: Option<String>| {
            raw.map(|v| parse_timestamp(&id, column, &v)).transpose()
        };

        Ok(Lead {
            created_at: parse_timestamp(&id, "created_at", &row.created_at)?,
            updated_at: parse_timestamp(&id, "updated_at", &row.updated_at)?,
            converted_at: optional_ts("converted_at", row.converted_at)?,
            gads_conversion_sent_at: optional_ts(
                "gads_conversion_sent_at",
                row.gads_conversion_sent_at,
            )?,
            name: row.name,
            practice_name: row.practice_name,
            email: row.email,
            phone: row.phone,
            website: row.website,
            project_type: row.project_type,
            status,
            status_history,
            notes: row.notes,
            conversion_value: row.conversion_value,
            attribution: AttributionData {
                utm_source: row.utm_source,
                utm_medium: row.utm_medium,
                utm_campaign: row.utm_campaign,
                utm_term: row.utm_term,
                utm_content: row.utm_content,
                gclid: row.gclid,
                fbclid: row.fbclid,
                msclkid: row.msclkid,
                ttclid: row.ttclid,
                li_fat_id: row.li_fat_id,
                landing_page: row.landing_page,
                referrer: row.referrer,
            },
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            gads_conversion_sent: row.gads_conversion_sent,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in LeadStatus::ALL {
            assert_eq!(status.as_str().parse::<LeadStatus>().unwrap(), status);
        }
        assert!("closed".parse::<LeadStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&LeadStatus::ProposalSent).unwrap(),
            "\"proposal_sent\""
        );
    }

    #[test]
    fn test_db_timestamp_is_fixed_width() {
        let a = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2026-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(db_timestamp(&a), "2026-01-01T00:00:00.000000Z");
        assert_eq!(db_timestamp(&a).len(), db_timestamp(&b).len());
        assert!(db_timestamp(&a) < db_timestamp(&b));
    }

    #[test]
    fn test_history_entry_omits_missing_actor() {
        let entry = StatusHistoryEntry {
            status: LeadStatus::Won,
            changed_at: Utc::now(),
            changed_by: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("changed_by").is_none());
        assert_eq!(json["status"], "won");
    }
}
