//! Init command implementation

use crate::config::Config;
use crate::error::Result;
use crate::leads::LeadStore;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub config_path: String,
    pub db_path: String,
    pub config_written: bool,
}

/// Write a default config (unless one exists) and create the lead schema
pub async fn cmd_init(options: InitOptions) -> Result<InitReport> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    let config_exists = config_path.exists();
    let config = if config_exists && !force {
        info!("Keeping existing config at {:?}", config_path);
        Config::load(&config_path)?
    } else {
        let mut config = Config::default();
        config.init_paths(Some(base_dir));
        config.paths.config_file = config_path.clone();
        config.validate()?;
        config.save()?;
        config
    };

    let store = LeadStore::connect(&config).await?;
    if store.is_initialized().await? {
        info!("Lead store already initialized");
    } else {
        store.init_schema().await?;
    }

    Ok(InitReport {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        config_written: !config_exists || force,
    })
}

/// Print init result to console
pub fn print_init(report: &InitReport) {
    if report.config_written {
        println!("✓ Wrote configuration to {}", report.config_path);
    } else {
        println!("✓ Using existing configuration at {}", report.config_path);
    }
    println!("✓ Lead database ready at {}", report.db_path);
    println!("\nNext steps:");
    println!("  1. Add [[admin.operators]] entries and export their token variables");
    println!("  2. Export RESEND_API_KEY and the GOOGLE_ADS_* variables");
    println!("  3. Run 'leadsync serve'");
}
