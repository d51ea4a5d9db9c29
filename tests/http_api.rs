//! End-to-end tests of the HTTP API against a real SQLite store, with the
//! Google Ads and email APIs mocked.

use leadsync::config::{EmailConfig, GoogleAdsConfig};
use leadsync::gads::{ConversionSync, GoogleAdsClient, GoogleAdsCredentials};
use leadsync::leads::{LeadQuery, LeadStore};
use leadsync::notify::{Notifier, ResendMailer};
use leadsync::server::{self, AppState, ContactRateLimiter, OperatorRegistry, ServiceSettings};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "operator-token";

struct TestApp {
    base: String,
    client: reqwest::Client,
    store: LeadStore,
    _dir: TempDir,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn submit(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/contact"))
            .header("x-forwarded-for", "203.0.113.7")
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

fn credentials() -> GoogleAdsCredentials {
    GoogleAdsCredentials {
        client_id: "cid".into(),
        client_secret: "secret".into(),
        developer_token: "dev-token".into(),
        refresh_token: "refresh".into(),
        customer_id: "1234567890".into(),
        conversion_action_id: "987".into(),
        login_customer_id: None,
    }
}

async fn spawn_app(google_ads: Option<&MockServer>, email: Option<&MockServer>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let store = LeadStore::connect_path(&dir.path().join("leads.db"), 2)
        .await
        .unwrap();
    store.init_schema().await.unwrap();

    let sync = match google_ads {
        Some(server) => {
            let config = GoogleAdsConfig {
                api_base_url: server.uri(),
                token_url: format!("{}/token", server.uri()),
                timeout_secs: 5,
                ..Default::default()
            };
            let client = GoogleAdsClient::new(&config, credentials()).unwrap();
            ConversionSync::new(Arc::new(client), "USD")
        }
        None => ConversionSync::disabled("USD"),
    };

    let notifier = match email {
        Some(server) => {
            let config = EmailConfig {
                api_base_url: server.uri(),
                ..Default::default()
            };
            let mailer = ResendMailer::new(&config, "re_test".into()).unwrap();
            Notifier::new(Arc::new(mailer), &config)
        }
        None => Notifier::disabled(&EmailConfig::default()),
    };

    let state = Arc::new(AppState {
        store: store.clone(),
        sync,
        notifier,
        operators: OperatorRegistry::new([("kim@agency.com".to_string(), TOKEN.to_string())]),
        limiter: ContactRateLimiter::new(3),
        settings: ServiceSettings {
            per_page: 25,
            sync_all_limit: 100,
            conversion_name: "Lead Submission".into(),
            currency: "USD".into(),
        },
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(server::serve_on(listener, state));

    TestApp {
        base,
        client: reqwest::Client::new(),
        store,
        _dir: dir,
    }
}

fn jo_li() -> Value {
    json!({
        "name": "Jo Li",
        "practiceName": "Li Clinic",
        "email": "JO@X.COM",
        "phone": "555-123-4567",
        "projectType": "new-website",
        "utm_source": "google",
        "utm_campaign": "",
        "gclid": "abc123"
    })
}

async fn mount_google_ads(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.token",
            "expires_in": 3599
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v18/customers/1234567890:uploadClickConversions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "gclid": "abc123" }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_contact_submission_is_stored_and_emailed() {
    let email = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "e1" })))
        .expect(2)
        .mount(&email)
        .await;
    let app = spawn_app(None, Some(&email)).await;

    let response = app.submit(jo_li()).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Thank you! We'll be in touch within 1 business day."
    );

    let lead = app
        .store
        .get(body["leadId"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(lead.email, "jo@x.com");
    assert_eq!(lead.phone, "5551234567");
    assert_eq!(lead.project_type.as_deref(), Some("new-website"));
    assert_eq!(lead.attribution.gclid.as_deref(), Some("abc123"));
    assert_eq!(lead.attribution.utm_campaign, None);
    assert_eq!(lead.ip_address.as_deref(), Some("203.0.113.7"));
    assert!(lead.status_history.is_empty());
}

#[tokio::test]
async fn test_contact_validation_and_rate_limit() {
    let app = spawn_app(None, None).await;

    let response = app
        .submit(json!({ "name": "J", "email": "nope", "phone": "12" }))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["practiceName"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert_eq!(app.store.count(&[]).await.unwrap(), 0);

    // Limit is 3 per minute; one attempt already spent above
    assert_eq!(app.submit(jo_li()).await.status(), 201);
    assert_eq!(app.submit(jo_li()).await.status(), 201);
    let response = app.submit(jo_li()).await;
    assert_eq!(response.status(), 429);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Failed to save your information. Please try again or call us directly."
    );
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_rate_limit() {
    let app = spawn_app(None, None).await;

    let mut statuses = Vec::new();
    for i in 0..5 {
        let response = app
            .client
            .post(app.url("/api/contact"))
            .header("x-forwarded-for", format!("10.0.0.{}", i))
            .json(&jo_li())
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, vec![201, 201, 201, 429, 429]);
    assert_eq!(app.store.count(&[]).await.unwrap(), 3);

    // The forwarded address is still what gets stored
    let leads = app.store.list(&LeadQuery::new()).await.unwrap();
    let mut stored: Vec<_> = leads.iter().filter_map(|l| l.ip_address.clone()).collect();
    stored.sort();
    assert_eq!(stored, vec!["10.0.0.0", "10.0.0.1", "10.0.0.2"]);
}

#[tokio::test]
async fn test_admin_requires_operator_token() {
    let app = spawn_app(None, None).await;

    let response = app
        .client
        .get(app.url("/api/admin/leads"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");

    let response = app
        .client
        .get(app.url("/api/admin/leads"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = app
        .client
        .get(app.url("/api/admin/leads"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["leads"], json!([]));
    assert_eq!(
        body["pagination"],
        json!({ "page": 1, "perPage": 25, "total": 0, "totalPages": 0 })
    );
}

#[tokio::test]
async fn test_won_status_auto_syncs_and_blocks_resync() {
    let google_ads = MockServer::start().await;
    mount_google_ads(&google_ads).await;
    let app = spawn_app(Some(&google_ads), None).await;

    let body: Value = app.submit(jo_li()).await.json().await.unwrap();
    let lead_id = body["leadId"].as_str().unwrap().to_string();

    let response = app
        .client
        .patch(app.url("/api/admin/leads"))
        .bearer_auth(TOKEN)
        .json(&json!({ "id": lead_id, "status": "won", "conversion_value": 4200 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["lead"]["status"], "won");
    assert_eq!(body["lead"]["gads_conversion_sent"], true);
    assert_eq!(body["lead"]["status_history"][0]["changed_by"], "kim@agency.com");
    assert_eq!(body["googleAdsSync"]["success"], true);

    let response = app
        .client
        .post(app.url("/api/admin/conversions/sync"))
        .bearer_auth(TOKEN)
        .json(&json!({ "leadId": lead_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = app
        .client
        .get(app.url("/api/admin/conversions/sync?stats=true"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["configured"], true);
    assert_eq!(
        body["stats"],
        json!({ "pendingSync": 0, "alreadySynced": 1, "totalWithGclid": 1 })
    );
}

#[tokio::test]
async fn test_sync_without_credentials_is_unavailable() {
    let app = spawn_app(None, None).await;

    let response = app
        .client
        .post(app.url("/api/admin/conversions/sync"))
        .bearer_auth(TOKEN)
        .json(&json!({ "syncAll": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Google Ads API not configured");

    let response = app
        .client
        .get(app.url("/api/admin/conversions/sync"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["configured"], false);
    assert!(body.get("stats").is_none());
}

#[tokio::test]
async fn test_csv_export() {
    let app = spawn_app(None, None).await;

    let response = app
        .client
        .get(app.url("/api/admin/conversions/export"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.submit(jo_li()).await;
    let mut no_click = jo_li();
    no_click["gclid"] = Value::Null;
    app.submit(no_click).await;

    let response = app
        .client
        .get(app.url("/api/admin/conversions/export?date_from=2020-01-01"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"google-ads-conversions-"));
    assert!(disposition.ends_with("-from-2020-01-01.csv\""));

    let csv = response.text().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("abc123,Lead Submission,"));
    assert!(lines[1].ends_with("+0000,1,USD"));
}
