//! Per-session attribution persistence
//!
//! The landing page and referrer are first-touch: once stored they are never
//! overwritten. Campaign tags and click ids from a newer URL replace older
//! ones. Concurrent writers are not coordinated; the last write wins.

use super::AttributionData;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;
use url::Url;

/// Fixed namespace the attribution record is stored under
pub const ATTRIBUTION_STORAGE_KEY: &str = "serpreme_attribution";

/// Durable client-side key/value store
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
    fn remove_item(&self, key: &str);
}

/// In-process storage, used by tests and server-side rendering
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .ok()
            .and_then(|items| items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.to_string(), value);
        }
    }

    fn remove_item(&self, key: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.remove(key);
        }
    }
}

/// Attribution captured across page views of one browsing session
pub struct AttributionSession<S: SessionStorage> {
    storage: S,
}

impl<S: SessionStorage> AttributionSession<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn stored(&self) -> AttributionData {
        let Some(raw) = self.storage.get_item(ATTRIBUTION_STORAGE_KEY) else {
            return AttributionData::default();
        };

        match serde_json::from_str::<AttributionData>(&raw) {
            Ok(data) => data.normalized(),
            Err(e) => {
                warn!("Failed to parse stored attribution data: {}", e);
                AttributionData::default()
            }
        }
    }

    fn store(&self, data: &AttributionData) {
        match serde_json::to_string(data) {
            Ok(json) => self.storage.set_item(ATTRIBUTION_STORAGE_KEY, json),
            Err(e) => warn!("Failed to store attribution data: {}", e),
        }
    }

    /// Record a page view: merge URL attribution and first-touch context.
    pub fn capture(&self, page_url: &str, referrer: Option<&str>) {
        let from_url = Url::parse(page_url)
            .ok()
            .and_then(|url| url.query().map(AttributionData::from_query))
            .unwrap_or_default();

        let mut data = self.stored();
        let before = data.clone();

        if data.landing_page.is_none() {
            data.set("landing_page", page_url);
        }
        if data.referrer.is_none() {
            if let Some(referrer) = referrer {
                data.set("referrer", referrer);
            }
        }
        data.merge_from(&from_url);

        if data != before {
            self.store(&data);
        }
    }

    /// Everything captured so far, absent fields as `None`
    pub fn attribution_data(&self) -> AttributionData {
        self.stored()
    }

    pub fn has_attribution_data(&self) -> bool {
        self.stored().has_any()
    }

    pub fn clear(&self) {
        self.storage.remove_item(ATTRIBUTION_STORAGE_KEY);
    }
}
