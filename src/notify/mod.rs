//! Lead notification emails
//!
//! Every captured lead triggers two sends: an internal notification to the
//! agency inbox and a confirmation to the submitter. Failures are logged and
//! reported back to the caller but never fail the submission.

mod templates;

pub use templates::*;

use crate::config::EmailConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// A single outbound email
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Transactional email transport
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ResendError {
    #[serde(default)]
    message: Option<String>,
}

/// Resend-compatible HTTP API client
pub struct ResendMailer {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl ResendMailer {
    pub fn new(config: &EmailConfig, api_key: String) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid email API URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid email API URL: {}", e)))
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("/emails")?)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ResendError>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("email API returned {}", status));
        Err(Error::Email(message))
    }
}

/// Result of one send attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendEmailResult {
    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                error: None,
            },
            Err(Error::Email(message)) => Self {
                success: false,
                error: Some(message),
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Outcome of both lead emails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEmailOutcome {
    pub client_notification: SendEmailResult,
    pub lead_confirmation: SendEmailResult,
}

/// Renders and sends the lead emails
#[derive(Clone)]
pub struct Notifier {
    sender: Option<Arc<dyn EmailSender>>,
    from: String,
    notify_email: String,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>, config: &EmailConfig) -> Self {
        Self {
            sender: Some(sender),
            from: format!("{} <{}>", config.from_name, config.from_email),
            notify_email: config.notify_email.clone(),
        }
    }

    /// A notifier that skips every send
    pub fn disabled(config: &EmailConfig) -> Self {
        Self {
            sender: None,
            from: format!("{} <{}>", config.from_name, config.from_email),
            notify_email: config.notify_email.clone(),
        }
    }

    /// Use Resend when the API key env var is set, otherwise disable sending
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => {
                let mailer = ResendMailer::new(config, key.trim().to_string())?;
                Ok(Self::new(Arc::new(mailer), config))
            }
            _ => {
                info!(
                    env = %config.api_key_env,
                    "Email API key not set; lead emails disabled"
                );
                Ok(Self::disabled(config))
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    async fn deliver(&self, label: &str, to: &str, content: EmailContent) -> SendEmailResult {
        let Some(sender) = &self.sender else {
            debug!(email = label, "Email sending disabled, skipping");
            return SendEmailResult {
                success: false,
                error: Some("Email sending is not configured".to_string()),
            };
        };

        let message = EmailMessage {
            from: self.from.clone(),
            to: vec![to.to_string()],
            subject: content.subject,
            html: content.html,
            text: content.text,
        };

        let result = SendEmailResult::from_result(sender.send(&message).await);
        match &result.error {
            None => info!(email = label, to = %to, "Email sent"),
            Some(e) => error!(email = label, to = %to, error = %e, "Failed to send email"),
        }
        result
    }

    /// Send the internal notification and the submitter confirmation
    /// concurrently. Never fails.
    pub async fn send_lead_emails(&self, lead: &LeadEmailData) -> LeadEmailOutcome {
        let (notification, confirmation) = futures::join!(
            self.deliver(
                "client_notification",
                &self.notify_email,
                client_notification(lead)
            ),
            self.deliver("lead_confirmation", &lead.email, lead_confirmation(lead)),
        );

        LeadEmailOutcome {
            client_notification: notification,
            lead_confirmation: confirmation,
        }
    }
}
