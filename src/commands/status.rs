//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::gads::GoogleAdsCredentials;
use crate::leads::{LeadStore, SyncStats};
use serde::Serialize;
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub bind: String,
    pub total_leads: u64,
    pub google_ads_configured: bool,
    pub google_ads_missing: Vec<String>,
    pub email_enabled: bool,
    pub operators: usize,
    pub sync: SyncStats,
}

/// Collect configuration and conversion sync state
pub async fn cmd_status(config: &Config, store: &LeadStore) -> Result<StatusInfo> {
    info!("Getting status");

    let lookup = |name: &str| std::env::var(name).ok();
    let google_ads_missing = GoogleAdsCredentials::missing_vars(&config.google_ads, lookup);
    let email_enabled = std::env::var(&config.email.api_key_env)
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false);

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        bind: config.server.bind.clone(),
        total_leads: store.count(&[]).await?,
        google_ads_configured: google_ads_missing.is_empty(),
        google_ads_missing,
        email_enabled,
        operators: config.admin.resolve_operators().len(),
        sync: store.sync_stats().await?,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 leadsync Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("Listen address: {}", status.bind);
    println!("Leads: {}", status.total_leads);

    println!("\nGoogle Ads:");
    if status.google_ads_configured {
        println!("  Status: ✓ Configured");
    } else {
        println!("  Status: ✗ Not configured");
        println!("  Missing: {}", status.google_ads_missing.join(", "));
    }
    println!("  Pending sync: {}", status.sync.pending_sync);
    println!("  Already synced: {}", status.sync.already_synced);
    println!("  Leads with gclid: {}", status.sync.total_with_gclid);

    println!(
        "\nEmail: {}",
        if status.email_enabled {
            "✓ Enabled"
        } else {
            "✗ Disabled (API key not set)"
        }
    );
    println!("Operators with tokens: {}", status.operators);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_on_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(temp_dir.path().to_path_buf()));
        config.google_ads.client_id_env = "LEADSYNC_TEST_UNSET_CLIENT_ID".to_string();

        let store = LeadStore::open(&config).await.unwrap();
        let status = cmd_status(&config, &store).await.unwrap();

        assert_eq!(status.total_leads, 0);
        assert_eq!(status.sync, SyncStats::default());
        assert!(!status.google_ads_configured);
        assert!(status
            .google_ads_missing
            .contains(&"LEADSYNC_TEST_UNSET_CLIENT_ID".to_string()));
    }
}
