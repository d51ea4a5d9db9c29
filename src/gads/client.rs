//! Google Ads REST client for click conversion uploads

use super::{ClickConversion, ConversionUploader, GoogleAdsCredentials, UploadResponse};
use crate::config::GoogleAdsConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Refresh this long before the access token actually expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadClickConversionsRequest<'a> {
    conversions: &'a [ClickConversion],
    partial_failure: bool,
}

#[derive(Debug, Serialize)]
struct RefreshTokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiError {
    Detailed { message: String },
    // OAuth endpoint errors are a bare code plus description
    Code(String),
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Authenticated client for one Google Ads customer account.
///
/// Constructed once per process; the OAuth access token is cached and
/// refreshed shortly before it expires.
pub struct GoogleAdsClient {
    client: Client,
    credentials: GoogleAdsCredentials,
    api_base: Url,
    api_version: String,
    token_url: Url,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleAdsClient {
    pub fn new(config: &GoogleAdsConfig, credentials: GoogleAdsCredentials) -> Result<Self> {
        let api_base = Url::parse(&config.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid Google Ads API URL: {}", e)))?;
        let token_url = Url::parse(&config.token_url)
            .map_err(|e| Error::Config(format!("Invalid OAuth token URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            credentials,
            api_base,
            api_version: config.api_version.clone(),
            token_url,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid Google Ads API URL: {}", e)))
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Refreshing Google Ads access token");
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&RefreshTokenRequest {
                grant_type: "refresh_token",
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
                refresh_token: &self.credentials.refresh_token,
            })
            .send()
            .await?;
        let parsed: TokenResponse = check_status(response).await?.json().await?;

        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(parsed.access_token)
    }
}

/// Turn a non-2xx response into [`Error::GoogleAds`] carrying the API's own message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(ApiErrorBody {
            error: ApiError::Detailed { message },
        }) => message,
        Ok(ApiErrorBody {
            error: ApiError::Code(code),
        }) => serde_json::from_str::<OAuthErrorBody>(&body)
            .ok()
            .and_then(|b| b.error_description)
            .unwrap_or(code),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body,
    };

    Err(Error::GoogleAds(format!("{} ({})", message, status.as_u16())))
}

#[async_trait]
impl ConversionUploader for GoogleAdsClient {
    async fn upload_click_conversions(
        &self,
        conversions: &[ClickConversion],
    ) -> Result<UploadResponse> {
        let access_token = self.access_token().await?;
        let url = self.endpoint(&format!(
            "/{}/customers/{}:uploadClickConversions",
            self.api_version, self.credentials.customer_id
        ))?;

        let mut request = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .header("developer-token", &self.credentials.developer_token)
            .json(&UploadClickConversionsRequest {
                conversions,
                partial_failure: true,
            });
        if let Some(login_id) = &self.credentials.login_customer_id {
            request = request.header("login-customer-id", login_id);
        }

        debug!(count = conversions.len(), "Uploading click conversions");
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<UploadResponse>().await?)
    }

    fn conversion_action(&self) -> String {
        self.credentials.conversion_action_resource()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> GoogleAdsCredentials {
        GoogleAdsCredentials {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            developer_token: "dev-token".into(),
            refresh_token: "refresh".into(),
            customer_id: "1234567890".into(),
            conversion_action_id: "987".into(),
            login_customer_id: Some("5550001111".into()),
        }
    }

    fn client_for(server: &MockServer) -> GoogleAdsClient {
        let config = GoogleAdsConfig {
            api_base_url: server.uri(),
            token_url: format!("{}/token", server.uri()),
            timeout_secs: 5,
            ..Default::default()
        };
        GoogleAdsClient::new(&config, credentials()).unwrap()
    }

    fn conversion() -> ClickConversion {
        ClickConversion {
            gclid: "abc123".into(),
            conversion_action: "customers/1234567890/conversionActions/987".into(),
            conversion_date_time: "2026-01-15 10:30:00+00:00".into(),
            conversion_value: 1.0,
            currency_code: "USD".into(),
        }
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_upload_sends_headers_and_caches_token() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/v18/customers/1234567890:uploadClickConversions"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(header("developer-token", "dev-token"))
            .and(header("login-customer-id", "5550001111"))
            .and(body_partial_json(serde_json::json!({
                "partialFailure": true,
                "conversions": [{
                    "gclid": "abc123",
                    "conversionAction": "customers/1234567890/conversionActions/987",
                    "conversionDateTime": "2026-01-15 10:30:00+00:00",
                    "currencyCode": "USD"
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"gclid": "abc123"}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        for _ in 0..2 {
            let response = client
                .upload_click_conversions(&[conversion()])
                .await
                .unwrap();
            assert_eq!(response.results.len(), 1);
            assert!(response.partial_failure_error.is_none());
        }
        assert_eq!(
            client.conversion_action(),
            "customers/1234567890/conversionActions/987"
        );
    }

    #[tokio::test]
    async fn test_partial_failure_is_parsed() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/v18/customers/1234567890:uploadClickConversions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{}],
                "partialFailureError": {"code": 3, "message": "The click was too old."}
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .upload_click_conversions(&[conversion()])
            .await
            .unwrap();
        assert_eq!(
            response
                .partial_failure_error
                .and_then(|e| e.message)
                .as_deref(),
            Some("The click was too old.")
        );
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/v18/customers/1234567890:uploadClickConversions"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Developer token is not approved.", "status": "PERMISSION_DENIED"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .upload_click_conversions(&[conversion()])
            .await
            .unwrap_err();
        match err {
            Error::GoogleAds(message) => {
                assert_eq!(message, "Developer token is not approved. (403)")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oauth_failure_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .upload_click_conversions(&[conversion()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GoogleAds(m) if m.starts_with("Token has been expired")));
    }
}
