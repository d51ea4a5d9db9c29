//! HTTP service
//!
//! `POST /api/contact` is public and rate limited per client. Everything
//! under `/api/admin` requires an operator bearer token.

mod auth;
mod handlers;
mod rate_limit;
mod response;

pub use auth::*;
pub use handlers::ContactSubmission;
pub use rate_limit::*;
pub use response::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gads::ConversionSync;
use crate::leads::LeadStore;
use crate::notify::Notifier;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Request-independent settings used by the handlers
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub per_page: u32,
    pub sync_all_limit: u32,
    pub conversion_name: String,
    pub currency: String,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            per_page: config.leads.per_page,
            sync_all_limit: config.leads.sync_all_limit,
            conversion_name: config.leads.conversion_name.clone(),
            currency: config.google_ads.currency.clone(),
        }
    }
}

/// Shared state behind every route
pub struct AppState {
    pub store: LeadStore,
    pub sync: ConversionSync,
    pub notifier: Notifier,
    pub operators: OperatorRegistry,
    pub limiter: ContactRateLimiter,
    pub settings: ServiceSettings,
}

impl AppState {
    /// Wire up the store and integrations described by `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = LeadStore::open(config).await?;
        let sync = ConversionSync::from_config(&config.google_ads)?;
        let notifier = Notifier::from_config(&config.email)?;
        let operators = OperatorRegistry::new(config.admin.resolve_operators());
        if operators.is_empty() {
            warn!("No operator tokens configured; the admin API will reject every request");
        }

        Ok(Self {
            store,
            sync,
            notifier,
            operators,
            limiter: ContactRateLimiter::new(config.contact.submissions_per_minute)
                .trust_proxy(config.contact.trust_proxy),
            settings: ServiceSettings::from_config(config),
        })
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route(
            "/leads",
            get(handlers::list_leads).patch(handlers::update_lead),
        )
        .route(
            "/conversions/sync",
            get(handlers::sync_status).post(handlers::sync_conversions),
        )
        .route("/conversions/export", get(handlers::export_conversions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_operator,
        ));

    Router::new()
        .route("/api/contact", post(handlers::submit_contact))
        .nest("/api/admin", admin)
        .with_state(state)
}

/// Serve `router` on an already bound listener until ctrl-c
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Listening");

    spawn_limiter_cleanup(state.clone());

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Bind the configured address and serve
pub async fn serve(config: &Config) -> Result<()> {
    let state = Arc::new(AppState::from_config(config).await?);
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| Error::Config(format!("Cannot bind {}: {}", config.server.bind, e)))?;
    serve_on(listener, state).await
}

fn spawn_limiter_cleanup(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            state.limiter.retain_recent();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
