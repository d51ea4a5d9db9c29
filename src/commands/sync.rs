//! Sync command implementation

use crate::admin::{sync_all_pending, SyncResponse};
use crate::config::Config;
use crate::error::Result;
use crate::gads::ConversionSync;
use crate::leads::LeadStore;

/// Upload pending conversions, capped like the HTTP "sync all" entry point
pub async fn cmd_sync(
    config: &Config,
    store: &LeadStore,
    sync: &ConversionSync,
    limit: Option<u32>,
) -> Result<SyncResponse> {
    let limit = limit
        .filter(|limit| *limit > 0)
        .unwrap_or(config.leads.sync_all_limit);
    sync_all_pending(store, sync, limit).await
}

/// Print sync result to console
pub fn print_sync(response: &SyncResponse) {
    let marker = if response.success { "✓" } else { "✗" };
    println!(
        "{} {}",
        marker,
        response.message.as_deref().unwrap_or("Sync finished")
    );

    let Some(batch) = &response.batch else {
        return;
    };
    println!("  Succeeded: {}", batch.success_count);
    println!("  Failed: {}", batch.failure_count);
    for result in batch.results.iter().filter(|r| !r.success) {
        println!(
            "  • {} ({}): {}",
            result.lead_id,
            result.gclid,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    for error in &batch.errors {
        println!("  ! {}", error);
    }
}
