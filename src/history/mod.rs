//! Status history tracking
//!
//! A lead's `status_history` only ever grows. A new entry is appended when a
//! status update actually changes the status; repeating the current status
//! is a no-op.

use crate::leads::{LeadStatus, StatusHistoryEntry};
use chrono::{DateTime, Utc};

/// Extend `history` for a move from `current` to `new_status`.
///
/// Returns `None` when the status does not change, so the caller can skip
/// writing the history column.
pub fn append_transition(
    current: LeadStatus,
    history: &[StatusHistoryEntry],
    new_status: LeadStatus,
    changed_at: DateTime<Utc>,
    changed_by: Option<&str>,
) -> Option<Vec<StatusHistoryEntry>> {
    if new_status == current {
        return None;
    }

    let mut extended = Vec::with_capacity(history.len() + 1);
    extended.extend_from_slice(history);
    extended.push(StatusHistoryEntry {
        status: new_status,
        changed_at,
        changed_by: changed_by.map(str::to_string),
    });
    Some(extended)
}

/// Whether `history` is a valid trail ending in `status`
pub fn is_consistent(status: LeadStatus, history: &[StatusHistoryEntry]) -> bool {
    let Some(last) = history.last() else {
        return status == LeadStatus::New;
    };

    let mut previous = LeadStatus::New;
    for entry in history {
        if entry.status == previous {
            return false;
        }
        previous = entry.status;
    }

    last.status == status && history.windows(2).all(|w| w[0].changed_at <= w[1].changed_at)
}
