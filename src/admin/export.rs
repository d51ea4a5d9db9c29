//! Offline conversion CSV export
//!
//! Produces the file format accepted by the Google Ads offline conversion
//! import. Only leads with a click id are ever exported.

use super::{date_range_filters, is_true, non_blank, status_filter};
use crate::error::{Error, Result};
use crate::leads::{Lead, LeadFilter, LeadQuery, LeadSort, LeadStatus, LeadStore};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

pub const CSV_HEADER: [&str; 5] = [
    "Google Click ID",
    "Conversion Name",
    "Conversion Time",
    "Conversion Value",
    "Conversion Currency",
];

/// Query string of `GET /api/admin/conversions/export`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub conversion_name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exclude_synced: Option<String>,
    #[serde(default)]
    pub only_converted: Option<String>,
}

impl ExportParams {
    pub fn filters(&self) -> Result<Vec<LeadFilter>> {
        let mut filters = vec![LeadFilter::HasGclid];
        if let Some(status) = status_filter(&self.status)? {
            filters.push(status);
        }
        if is_true(&self.only_converted) {
            filters.push(LeadFilter::Status(LeadStatus::Won));
        }
        if is_true(&self.exclude_synced) {
            filters.push(LeadFilter::ConversionSent(false));
        }
        filters.extend(date_range_filters(&self.date_from, &self.date_to)?);
        Ok(filters)
    }

    fn file_name(&self, today: DateTime<Utc>) -> String {
        let mut name = format!("google-ads-conversions-{}", today.format("%Y-%m-%d"));
        if let Some(from) = non_blank(&self.date_from) {
            name.push_str("-from-");
            name.push_str(from);
        }
        if let Some(to) = non_blank(&self.date_to) {
            name.push_str("-to-");
            name.push_str(to);
        }
        name.push_str(".csv");
        name
    }
}

/// Rendered export file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
    pub rows: usize,
}

/// Quote a field if it contains a comma, quote or line break
pub fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Import files use `YYYY-MM-DD HH:MM:SS+0000`
pub fn format_export_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S+0000").to_string()
}

fn csv_row(lead: &Lead, conversion_name: &str, currency: &str) -> String {
    [
        escape_csv(lead.gclid().unwrap_or_default()),
        escape_csv(conversion_name),
        format_export_time(&lead.conversion_time()),
        lead.effective_conversion_value().to_string(),
        escape_csv(currency),
    ]
    .join(",")
}

/// Render the CSV for `leads`
pub fn render_csv(leads: &[Lead], conversion_name: &str, currency: &str) -> String {
    std::iter::once(CSV_HEADER.join(","))
        .chain(leads.iter().map(|lead| csv_row(lead, conversion_name, currency)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the conversion export.
///
/// `default_conversion_name` and `default_currency` apply when the request
/// leaves those parameters blank.
pub async fn export_conversions(
    store: &LeadStore,
    params: &ExportParams,
    default_conversion_name: &str,
    default_currency: &str,
) -> Result<CsvExport> {
    let query = LeadQuery::new()
        .filters(params.filters()?)
        .sort(LeadSort::oldest_first());
    let leads = store.list(&query).await?;

    if leads.is_empty() {
        return Err(Error::NotFound(
            "No leads with gclid found matching the filters".to_string(),
        ));
    }

    let conversion_name = non_blank(&params.conversion_name).unwrap_or(default_conversion_name);
    let currency = non_blank(&params.currency).unwrap_or(default_currency);

    info!(rows = leads.len(), "Exporting conversions");
    Ok(CsvExport {
        filename: params.file_name(Utc::now()),
        body: render_csv(&leads, conversion_name, currency),
        rows: leads.len(),
    })
}
