//! Configuration management for leadsync
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Secrets are never written to the file; each section names the environment
//! variables that hold them.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Lead store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// CRM listing, sync and export settings
    #[serde(default)]
    pub leads: LeadsConfig,

    /// Public contact endpoint settings
    #[serde(default)]
    pub contact: ContactConfig,

    /// Operator accounts for the admin API
    #[serde(default)]
    pub admin: AdminConfig,

    /// Google Ads offline conversion integration
    #[serde(default)]
    pub google_ads: GoogleAdsConfig,

    /// Transactional email integration
    #[serde(default)]
    pub email: EmailConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:3000`
    #[serde(default = "default_bind_addr")]
    pub bind: String,
}

/// Lead store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Explicit SQLite file; defaults to `leads.db` next to the config file
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// CRM listing, sync and export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadsConfig {
    /// Fixed page size of the admin lead listing
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Cap on leads fetched by one "sync all pending" call
    #[serde(default = "default_sync_all_limit")]
    pub sync_all_limit: u32,

    /// Default conversion name for CSV export
    #[serde(default = "default_conversion_name")]
    pub conversion_name: String,
}

/// Public contact endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Submissions allowed per originating IP per minute
    #[serde(default = "default_submissions_per_minute")]
    pub submissions_per_minute: u32,

    /// Key the limiter on the right-most `X-Forwarded-For` hop instead of
    /// the socket peer. Only enable behind a proxy that appends that header.
    #[serde(default)]
    pub trust_proxy: bool,
}

/// Operator accounts for the admin API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub operators: Vec<OperatorConfig>,
}

/// A single CRM operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Recorded as `changed_by` in status history
    pub email: String,

    /// Environment variable holding this operator's bearer token
    pub token_env: String,
}

/// Google Ads offline conversion integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleAdsConfig {
    #[serde(default = "default_gads_client_id_env")]
    pub client_id_env: String,

    #[serde(default = "default_gads_client_secret_env")]
    pub client_secret_env: String,

    #[serde(default = "default_gads_developer_token_env")]
    pub developer_token_env: String,

    #[serde(default = "default_gads_refresh_token_env")]
    pub refresh_token_env: String,

    #[serde(default = "default_gads_customer_id_env")]
    pub customer_id_env: String,

    #[serde(default = "default_gads_conversion_action_id_env")]
    pub conversion_action_id_env: String,

    #[serde(default = "default_gads_login_customer_id_env")]
    pub login_customer_id_env: String,

    #[serde(default = "default_gads_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_gads_api_version")]
    pub api_version: String,

    #[serde(default = "default_gads_token_url")]
    pub token_url: String,

    /// Currency code attached to uploaded conversions
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

/// Transactional email integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Environment variable holding the API key; unset disables sending
    #[serde(default = "default_email_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_email_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Internal inbox for new-lead notifications
    #[serde(default = "default_notify_email")]
    pub notify_email: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for leadsync data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            leads: LeadsConfig::default(),
            contact: ContactConfig::default(),
            admin: AdminConfig::default(),
            google_ads: GoogleAdsConfig::default(),
            email: EmailConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_addr(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LeadsConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            sync_all_limit: default_sync_all_limit(),
            conversion_name: default_conversion_name(),
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            submissions_per_minute: default_submissions_per_minute(),
            trust_proxy: false,
        }
    }
}

impl Default for GoogleAdsConfig {
    fn default() -> Self {
        Self {
            client_id_env: default_gads_client_id_env(),
            client_secret_env: default_gads_client_secret_env(),
            developer_token_env: default_gads_developer_token_env(),
            refresh_token_env: default_gads_refresh_token_env(),
            customer_id_env: default_gads_customer_id_env(),
            conversion_action_id_env: default_gads_conversion_action_id_env(),
            login_customer_id_env: default_gads_login_customer_id_env(),
            api_base_url: default_gads_api_base_url(),
            api_version: default_gads_api_version(),
            token_url: default_gads_token_url(),
            currency: default_currency(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_email_api_key_env(),
            api_base_url: default_email_api_base_url(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            notify_email: default_notify_email(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Config {
    /// Get the default base directory for leadsync (~/.leadsync)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".leadsync")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: self
                .database
                .path
                .clone()
                .unwrap_or_else(|| base.join("leads.db")),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: config
                .database
                .path
                .clone()
                .unwrap_or_else(|| base.join("leads.db")),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.init_paths(Some(config.paths.base_dir.clone()));
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.leads.per_page == 0 {
            return Err(Error::Config("leads.per_page must be positive".to_string()));
        }

        if self.leads.sync_all_limit == 0 {
            return Err(Error::Config(
                "leads.sync_all_limit must be positive".to_string(),
            ));
        }

        if self.contact.submissions_per_minute == 0 {
            return Err(Error::Config(
                "contact.submissions_per_minute must be positive".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be positive".to_string(),
            ));
        }

        for operator in &self.admin.operators {
            if operator.email.trim().is_empty() {
                return Err(Error::Config(
                    "admin.operators entries need an email".to_string(),
                ));
            }
            if operator.token_env.trim().is_empty() {
                return Err(Error::Config(format!(
                    "admin operator '{}' has an empty token_env",
                    operator.email
                )));
            }
        }

        if self.google_ads.currency.len() != 3 {
            return Err(Error::Config(
                "google_ads.currency must be a 3-letter ISO code".to_string(),
            ));
        }

        Ok(())
    }
}

impl AdminConfig {
    /// Resolve operator tokens from the environment, skipping unset ones
    pub fn resolve_operators(&self) -> Vec<(String, String)> {
        self.operators
            .iter()
            .filter_map(|op| match std::env::var(&op.token_env) {
                Ok(token) if !token.trim().is_empty() => Some((op.email.clone(), token)),
                _ => {
                    tracing::warn!(
                        operator = %op.email,
                        env = %op.token_env,
                        "Operator token not set; operator cannot sign in"
                    );
                    None
                }
            })
            .collect()
    }
}
