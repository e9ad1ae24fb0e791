//! Rate limiting middleware.
//!
//! Two limits apply to every RPC call: one shared by all callers and one per
//! client IP. Requests without connection info (e.g. in-process tests) are only
//! subject to the shared limit.

use crate::config::RateLimitConfig;
use crate::error::RegistryError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{keyed::DefaultKeyedStateStore, InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::net::{IpAddr, SocketAddr};
use std::{num::NonZeroU32, sync::Arc};
use tracing::{debug, warn};

/// Tracked clients above which idle limiter entries are pruned.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Limiter shared by all callers.
pub type GlobalLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Limiter keyed by client IP.
pub type ClientLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    pub global: Arc<GlobalLimiter>,
    pub per_client: Arc<ClientLimiter>,
}

impl RateLimitState {
    /// Create limiters from requests-per-minute quotas. Zero disables a limit.
    pub fn new(global_per_minute: u32, per_client_per_minute: u32) -> Self {
        Self {
            global: Arc::new(RateLimiter::direct(quota(global_per_minute))),
            per_client: Arc::new(RateLimiter::keyed(quota(per_client_per_minute))),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.global_per_minute, config.per_client_per_minute)
    }

    /// No effective limit, for tests.
    pub fn permissive() -> Self {
        Self::new(0, 0)
    }

    /// Check both limits for a request from `client`.
    pub fn check(&self, client: Option<IpAddr>) -> Result<(), RegistryError> {
        if let Some(ip) = client {
            if self.per_client.len() > MAX_TRACKED_CLIENTS {
                self.per_client.retain_recent();
            }
            if self.per_client.check_key(&ip).is_err() {
                warn!(client = %ip, "Per-client rate limit exceeded");
                return Err(RegistryError::RateLimitExceeded);
            }
        }

        if self.global.check().is_err() {
            warn!("Global rate limit exceeded");
            return Err(RegistryError::RateLimitExceeded);
        }
        Ok(())
    }
}

/// A zero quota means unlimited, which governor expresses as `u32::MAX` per minute.
fn quota(per_minute: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MAX))
}

/// Rejects the request with 429 when either limit is exhausted.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RegistryError> {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    rate_limit.check(client)?;
    debug!(client = ?client, "Rate limit check passed");

    Ok(next.run(request).await)
}
