//! HTTP API for the device registry.
//!
//! Operations are invoked as `POST /registration/v1/{operation}` with a JSON
//! parameter body. There is no authentication: anyone who can reach the
//! listener can register, unregister, and list tokens. Deploy behind an
//! authenticating proxy.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{rate_limit_middleware, ClientLimiter, GlobalLimiter, RateLimitState};
pub use types::*;

use crate::config::RateLimitConfig;
use crate::directory::Directory;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Registration directory
    pub directory: Arc<Directory>,
}

impl AppState {
    /// Create new application state.
    pub fn new(directory: Directory) -> Self {
        Self {
            directory: Arc::new(directory),
        }
    }
}

/// Create the API router with the default rate limits.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(
        state,
        RateLimitState::from_config(&RateLimitConfig::default()),
    )
}

/// Create the API router with custom rate limiting.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let rpc = Router::new()
        .route("/registration/v1/:operation", post(handlers::invoke))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .merge(rpc)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
