//! Per-client rate limiting for public submissions

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::net::IpAddr;
use std::num::NonZeroU32;
use tracing::warn;

/// Keyed limiter over client addresses
///
/// The key is the socket peer unless `trust_proxy` is set, in which case it
/// is the right-most `X-Forwarded-For` hop (the address the proxy saw).
/// Left-hand hops are client supplied and never used as keys.
pub struct ContactRateLimiter {
    limiter: RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
    trust_proxy: bool,
}

impl ContactRateLimiter {
    /// Allow `per_minute` submissions per client, with the full quota as burst
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(nonzero!(1u32));
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            trust_proxy: false,
        }
    }

    pub fn trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    /// Resolve the limiter key for a request
    pub fn client_key(
        &self,
        forwarded_for: Option<&str>,
        peer: Option<IpAddr>,
    ) -> Option<String> {
        if self.trust_proxy {
            let last_hop = forwarded_for
                .and_then(|v| v.rsplit(',').map(str::trim).find(|hop| !hop.is_empty()));
            if let Some(hop) = last_hop {
                return Some(hop.to_string());
            }
        }
        peer.map(|ip| ip.to_string())
    }

    /// Record a submission from `client`. Clients without a known address
    /// share one bucket.
    pub fn check(&self, client: Option<&str>) -> bool {
        let key = client.unwrap_or("unknown").to_string();
        let allowed = self.limiter.check_key(&key).is_ok();
        if !allowed {
            warn!(client = %key, "Contact submission rate limited");
        }
        allowed
    }

    /// Drop state for clients whose quota has fully replenished
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}
