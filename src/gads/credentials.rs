//! Google Ads API credentials resolved from the environment

use crate::config::GoogleAdsConfig;
use std::fmt;

/// The six required values plus the optional manager account id
#[derive(Clone, PartialEq, Eq)]
pub struct GoogleAdsCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub developer_token: String,
    pub refresh_token: String,
    /// Digits only
    pub customer_id: String,
    pub conversion_action_id: String,
    /// Manager (MCC) account, digits only
    pub login_customer_id: Option<String>,
}

impl fmt::Debug for GoogleAdsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleAdsCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("developer_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("customer_id", &self.customer_id)
            .field("conversion_action_id", &self.conversion_action_id)
            .field("login_customer_id", &self.login_customer_id)
            .finish()
    }
}

fn strip_dashes(id: &str) -> String {
    id.chars().filter(|c| *c != '-').collect()
}

impl GoogleAdsCredentials {
    /// Read credentials from the process environment
    pub fn from_env(config: &GoogleAdsConfig) -> Option<Self> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`; `None` if any required value is
    /// missing or blank
    pub fn from_lookup<F>(config: &GoogleAdsConfig, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Some(Self {
            client_id: get(&config.client_id_env)?,
            client_secret: get(&config.client_secret_env)?,
            developer_token: get(&config.developer_token_env)?,
            refresh_token: get(&config.refresh_token_env)?,
            customer_id: strip_dashes(&get(&config.customer_id_env)?),
            conversion_action_id: get(&config.conversion_action_id_env)?,
            login_customer_id: get(&config.login_customer_id_env).map(|id| strip_dashes(&id)),
        })
    }

    /// Names of required variables that are unset or blank
    pub fn missing_vars<F>(config: &GoogleAdsConfig, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        [
            &config.client_id_env,
            &config.client_secret_env,
            &config.developer_token_env,
            &config.refresh_token_env,
            &config.customer_id_env,
            &config.conversion_action_id_env,
        ]
        .into_iter()
        .filter(|name| lookup(name).map_or(true, |v| v.trim().is_empty()))
        .cloned()
        .collect()
    }

    /// `customers/{customer_id}/conversionActions/{conversion_action_id}`
    pub fn conversion_action_resource(&self) -> String {
        format!(
            "customers/{}/conversionActions/{}",
            self.customer_id, self.conversion_action_id
        )
    }
}
