//! Default values for configuration

/// Default HTTP bind address
pub fn default_bind_addr() -> String {
    std::env::var("LEADSYNC_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string())
}

/// Default SQLite pool size
pub fn default_max_connections() -> u32 {
    5
}

/// Leads shown per CRM page
pub fn default_per_page() -> u32 {
    25
}

/// Maximum leads fetched by a single "sync all pending" invocation
pub fn default_sync_all_limit() -> u32 {
    100
}

/// Conversion name written to exported CSV rows
pub fn default_conversion_name() -> String {
    "Lead Submission".to_string()
}

/// Conversion currency
pub fn default_currency() -> String {
    "USD".to_string()
}

/// Contact form submissions allowed per originating IP per minute
pub fn default_submissions_per_minute() -> u32 {
    5
}

pub fn default_gads_client_id_env() -> String {
    "GOOGLE_ADS_CLIENT_ID".to_string()
}

pub fn default_gads_client_secret_env() -> String {
    "GOOGLE_ADS_CLIENT_SECRET".to_string()
}

pub fn default_gads_developer_token_env() -> String {
    "GOOGLE_ADS_DEVELOPER_TOKEN".to_string()
}

pub fn default_gads_refresh_token_env() -> String {
    "GOOGLE_ADS_REFRESH_TOKEN".to_string()
}

pub fn default_gads_customer_id_env() -> String {
    "GOOGLE_ADS_CUSTOMER_ID".to_string()
}

pub fn default_gads_conversion_action_id_env() -> String {
    "GOOGLE_ADS_CONVERSION_ACTION_ID".to_string()
}

/// Manager (MCC) account id, only needed for client accounts behind a manager
pub fn default_gads_login_customer_id_env() -> String {
    "GOOGLE_ADS_LOGIN_CUSTOMER_ID".to_string()
}

/// Google Ads REST API base URL
pub fn default_gads_api_base_url() -> String {
    "https://googleads.googleapis.com".to_string()
}

/// Google Ads REST API version segment
pub fn default_gads_api_version() -> String {
    "v18".to_string()
}

/// OAuth2 token endpoint used for the refresh-token grant
pub fn default_gads_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Outbound request timeout in seconds
pub fn default_http_timeout() -> u64 {
    30
}

/// Environment variable holding the transactional email API key
pub fn default_email_api_key_env() -> String {
    "RESEND_API_KEY".to_string()
}

pub fn default_email_api_base_url() -> String {
    "https://api.resend.com".to_string()
}

pub fn default_from_email() -> String {
    "khall@serpremeseo.com".to_string()
}

pub fn default_from_name() -> String {
    "SERPreme SEO".to_string()
}

/// Internal address that receives new-lead notifications
pub fn default_notify_email() -> String {
    "khall@serpremeseo.com".to_string()
}
