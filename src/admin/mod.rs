//! CRM operations behind the admin API
//!
//! - Lead listing with filters, sorting and pagination
//! - Status updates with history tracking and automatic conversion sync
//! - Manual conversion sync entry points
//! - Offline conversion CSV export

mod export;
mod query;
mod sync;
mod workflow;

pub use export::*;
pub use query::*;
pub use sync::*;
pub use workflow::*;

use crate::error::{Error, Result};
use crate::leads::{LeadFilter, LeadStatus};
use chrono::{DateTime, Duration, NaiveDate, Utc};

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(raw: &str, param: &str) -> Result<DateTime<Utc>> {
    let invalid = || Error::InvalidRequest(format!("Invalid {}: {}", param, raw));

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .ok_or_else(invalid);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}

/// Filters for a `created_at` range.
///
/// `date_from` is inclusive from the start of that day. `date_to` includes
/// the whole named day, so the upper bound is the following midnight.
pub fn date_range_filters(
    date_from: &Option<String>,
    date_to: &Option<String>,
) -> Result<Vec<LeadFilter>> {
    let mut filters = Vec::new();

    if let Some(raw) = non_blank(date_from) {
        let from = parse_bound(raw, "date_from")?;
        filters.push(LeadFilter::CreatedFrom(from));
    }
    if let Some(raw) = non_blank(date_to) {
        let to = parse_bound(raw, "date_to")?;
        filters.push(LeadFilter::CreatedBefore(to + Duration::days(1)));
    }

    Ok(filters)
}

/// Optional status filter; blank and `all` mean no filter
pub fn status_filter(status: &Option<String>) -> Result<Option<LeadFilter>> {
    match non_blank(status) {
        None | Some("all") => Ok(None),
        Some(raw) => Ok(Some(LeadFilter::Status(raw.parse::<LeadStatus>()?))),
    }
}

fn is_true(flag: &Option<String>) -> bool {
    non_blank(flag) == Some("true")
}
