//! Attribution capture
//!
//! Campaign tags and advertising click identifiers are read from landing URL
//! query strings into a flat [`AttributionData`] record. Missing keys are
//! simply absent. [`AttributionSession`] keeps the first-seen landing page and
//! referrer for a browsing session so the values survive navigation to the
//! page that hosts the form.

mod session;

pub use session::*;

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use url::form_urlencoded;

/// Campaign tag query keys
pub const UTM_PARAMS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

/// Advertising platform click identifier query keys
pub const CLICK_ID_PARAMS: [&str; 5] = [
    "gclid",     // Google Ads
    "fbclid",    // Meta
    "msclkid",   // Microsoft Ads
    "ttclid",    // TikTok
    "li_fat_id", // LinkedIn
];

/// Flat attribution record captured at submission time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionData {
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub utm_term: Option<String>,
    #[serde(default)]
    pub utm_content: Option<String>,

    #[serde(default)]
    pub gclid: Option<String>,
    #[serde(default)]
    pub fbclid: Option<String>,
    #[serde(default)]
    pub msclkid: Option<String>,
    #[serde(default)]
    pub ttclid: Option<String>,
    #[serde(default)]
    pub li_fat_id: Option<String>,

    #[serde(default)]
    pub landing_page: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

impl AttributionData {
    /// Parse the known keys out of a URL query string (without the `?`)
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(form_urlencoded::parse(query.trim_start_matches('?').as_bytes()))
    }

    /// Build from key/value pairs; unknown keys are ignored, first value wins
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut data = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let is_known = UTM_PARAMS.contains(&key) || CLICK_ID_PARAMS.contains(&key);
            if is_known && data.get(key).is_none() {
                data.set(key, value.as_ref());
            }
        }
        data
    }

    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "utm_source" => &mut self.utm_source,
            "utm_medium" => &mut self.utm_medium,
            "utm_campaign" => &mut self.utm_campaign,
            "utm_term" => &mut self.utm_term,
            "utm_content" => &mut self.utm_content,
            "gclid" => &mut self.gclid,
            "fbclid" => &mut self.fbclid,
            "msclkid" => &mut self.msclkid,
            "ttclid" => &mut self.ttclid,
            "li_fat_id" => &mut self.li_fat_id,
            "landing_page" => &mut self.landing_page,
            "referrer" => &mut self.referrer,
            _ => return None,
        };
        Some(slot)
    }

    /// Look up a field by its wire key
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "utm_source" => &self.utm_source,
            "utm_medium" => &self.utm_medium,
            "utm_campaign" => &self.utm_campaign,
            "utm_term" => &self.utm_term,
            "utm_content" => &self.utm_content,
            "gclid" => &self.gclid,
            "fbclid" => &self.fbclid,
            "msclkid" => &self.msclkid,
            "ttclid" => &self.ttclid,
            "li_fat_id" => &self.li_fat_id,
            "landing_page" => &self.landing_page,
            "referrer" => &self.referrer,
            _ => return None,
        };
        value.as_deref()
    }

    /// Set a field by its wire key; blank values clear it
    pub fn set(&mut self, key: &str, value: &str) {
        let trimmed = value.trim();
        if let Some(slot) = self.slot(key) {
            *slot = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
    }

    /// Overlay every present value from `newer`
    pub fn merge_from(&mut self, newer: &AttributionData) {
        for key in UTM_PARAMS
            .iter()
            .chain(CLICK_ID_PARAMS.iter())
            .chain(["landing_page", "referrer"].iter())
        {
            if let Some(value) = newer.get(key) {
                self.set(key, value);
            }
        }
    }

    /// Treat empty strings as absent
    pub fn normalized(self) -> Self {
        let mut clean = Self::default();
        clean.merge_from(&self);
        clean
    }

    pub fn has_any(&self) -> bool {
        UTM_PARAMS
            .iter()
            .chain(CLICK_ID_PARAMS.iter())
            .chain(["landing_page", "referrer"].iter())
            .any(|key| self.get(key).is_some())
    }
}

/// Request metadata stored alongside attribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RequestContext {
    /// Resolve the originating client from proxy headers, falling back to the
    /// socket peer
    pub fn from_headers(
        user_agent: Option<&str>,
        forwarded_for: Option<&str>,
        real_ip: Option<&str>,
        peer: Option<IpAddr>,
    ) -> Self {
        let non_blank = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let forwarded = forwarded_for.and_then(|v| non_blank(v.split(',').next()));
        let ip_address = forwarded
            .or_else(|| non_blank(real_ip))
            .or_else(|| peer.map(|ip| ip.to_string()));

        Self {
            user_agent: non_blank(user_agent),
            ip_address,
        }
    }
}
