//! Per-client request throttle.
//!
//! Each client key may make one request per cooldown window. State is a
//! process-wide map from key to the time of the last allowed request, pruned
//! once it grows past a threshold.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::RateLimitConfig;

/// Key used when nothing identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Backing storage for last-request timestamps.
pub trait ThrottleStore: Send + Sync {
    /// Records `now_ms` for `key` unless the previous request is less than
    /// `cooldown_ms` old. Returns whether the request is allowed.
    ///
    /// Must be atomic: two concurrent calls for one key cannot both pass.
    fn check_and_record(&self, key: &str, now_ms: u64, cooldown_ms: u64) -> bool;

    /// Deletes entries last seen before `cutoff_ms`. Returns how many went.
    fn prune_older_than(&self, cutoff_ms: u64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store. Lives as long as the process; nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, u64>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThrottleStore for InMemoryStore {
    fn check_and_record(&self, key: &str, now_ms: u64, cooldown_ms: u64) -> bool {
        let mut entries = self.entries.lock();
        if let Some(&last) = entries.get(key) {
            if now_ms.saturating_sub(last) < cooldown_ms {
                return false;
            }
        }
        entries.insert(key.to_string(), now_ms);
        true
    }

    fn prune_older_than(&self, cutoff_ms: u64) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, last| *last >= cutoff_ms);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn ThrottleStore>,
    cooldown: Duration,
    retention: Duration,
    prune_threshold: usize,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entries", &self.store.len())
            .field("cooldown", &self.cooldown)
            .field("retention", &self.retention)
            .field("prune_threshold", &self.prune_threshold)
            .finish()
    }
}

impl RateLimiter {
    /// Creates a limiter over an in-memory store.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryStore::new()))
    }

    pub fn with_store(config: &RateLimitConfig, store: Arc<dyn ThrottleStore>) -> Self {
        Self {
            store,
            cooldown: Duration::from_millis(config.cooldown_ms),
            retention: Duration::from_millis(config.retention_ms),
            prune_threshold: config.prune_threshold,
        }
    }

    /// Returns true if `client_key` may proceed now.
    pub fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, now_ms())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock reading.
    pub fn allow_at(&self, client_key: &str, now_ms: u64) -> bool {
        let allowed = self
            .store
            .check_and_record(client_key, now_ms, self.cooldown.as_millis() as u64);

        if allowed && self.store.len() > self.prune_threshold {
            let cutoff = now_ms.saturating_sub(self.retention.as_millis() as u64);
            let removed = self.store.prune_older_than(cutoff);
            debug!(removed, "Pruned stale rate limit entries");
        }

        allowed
    }

    /// Human wording of the cooldown, as used in the 429 message.
    pub fn retry_hint(&self) -> String {
        let ms = self.cooldown.as_millis();
        match ms {
            1000 => "1 second".to_string(),
            ms if ms % 1000 == 0 => format!("{} seconds", ms / 1000),
            ms => format!("{ms} ms"),
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Identifies the caller: first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the peer address.
///
/// Both headers are client-controlled; the key is only as good as the proxy
/// in front of the server.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
