//! Rate limiting.
//!
//! Fixed-window request counter per client identifier, held in memory.
//! Each check is one locked read-check-increment, so concurrent requests
//! from the same client cannot undercount. The map is bounded by
//! `max_clients` and swept by a background task.

use axum::http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Shared bucket for requests that carry no usable client address
pub const UNKNOWN_CLIENT: &str = "unknown";

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Configuration for rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    /// Maximum number of client identifiers tracked at once.
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            max_clients: 100_000,
        }
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateLimitDecision {
    /// Time until the window resets, rounded up to whole seconds
    pub fn retry_after_secs(&self, now: Instant) -> u64 {
        let left = self.reset_at.saturating_duration_since(now);
        let secs = left.as_secs();
        if left.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

/// Rate limiter state tracking requests per client.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    /// Count one request from `identifier` and decide whether it may proceed.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }

    pub(crate) fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let limit = self.config.max_requests;
        if limit == 0 {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: now + self.config.window,
            };
        }

        let mut state = self.state.lock();

        if let Some(entry) = state.get_mut(identifier) {
            if now < entry.reset_at {
                if entry.count >= limit {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: entry.reset_at,
                    };
                }
                entry.count += 1;
                return RateLimitDecision {
                    allowed: true,
                    remaining: limit - entry.count,
                    reset_at: entry.reset_at,
                };
            }

            // Window expired: start a fresh one
            entry.count = 1;
            entry.reset_at = now + self.config.window;
            return RateLimitDecision {
                allowed: true,
                remaining: limit.saturating_sub(1),
                reset_at: entry.reset_at,
            };
        }

        if state.len() >= self.config.max_clients {
            make_room(&mut state, self.config.max_clients, now);
        }

        let reset_at = now + self.config.window;
        state.insert(identifier.to_string(), RateLimitEntry { count: 1, reset_at });

        RateLimitDecision {
            allowed: true,
            remaining: limit.saturating_sub(1),
            reset_at,
        }
    }

    /// Drop entries whose window has expired. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub(crate) fn cleanup_at(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        let before = state.len();
        state.retain(|_, entry| now < entry.reset_at);
        before - state.len()
    }

    /// Number of tracked client identifiers
    pub fn tracked_clients(&self) -> usize {
        self.state.lock().len()
    }

    /// Periodically sweep expired entries from a background task.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = limiter.cleanup();
                if removed > 0 {
                    debug!(
                        removed,
                        tracked = limiter.tracked_clients(),
                        "Rate limiter sweep"
                    );
                }
            }
        })
    }
}

/// Free one slot in a full map: purge expired entries, else evict the
/// entry whose window ends soonest.
fn make_room(state: &mut HashMap<String, RateLimitEntry>, max_clients: usize, now: Instant) {
    state.retain(|_, entry| now < entry.reset_at);
    if state.len() < max_clients {
        return;
    }

    let oldest = state
        .iter()
        .min_by_key(|(_, entry)| entry.reset_at)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        warn!(client = %key, "Rate limiter at capacity, evicting client");
        state.remove(&key);
    }
}

/// Canonical client identifier for a request.
///
/// Uses the first `X-Forwarded-For` entry, else the socket peer, else the
/// shared `unknown` bucket. IPv6 loopback is folded into `127.0.0.1`.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_string);

    let ip = forwarded.or_else(|| peer.map(|addr| addr.ip().to_string()));

    match ip.as_deref() {
        None => UNKNOWN_CLIENT.to_string(),
        Some("::1") => "127.0.0.1".to_string(),
        Some(ip) => ip.to_string(),
    }
}

/// Advertise the caller's quota on a response
pub fn apply_quota_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitDecision) {
    let reset = decision.retry_after_secs(Instant::now());
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset));
}

/// `Retry-After` for a rejected request
pub fn apply_retry_after(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let secs = decision.retry_after_secs(Instant::now());
    headers.insert(RETRY_AFTER, HeaderValue::from(secs));
}
