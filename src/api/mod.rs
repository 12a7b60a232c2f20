//! HTTP surface of the middle tier.

mod error;
mod handlers;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::service::FeedService;

pub use error::{ApiError, ApiResult};
pub use handlers::SubscriptionForm;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FeedService>,
    /// Reject subscribe requests whose `url` is blank or not http(s).
    pub validate_urls: bool,
    /// Reject subscriptions to loopback/private hosts. Implies `validate_urls`.
    pub block_private_hosts: bool,
}

impl AppState {
    /// State that accepts any submitted `url`.
    pub fn new(service: FeedService) -> Self {
        Self {
            service: Arc::new(service),
            validate_urls: false,
            block_private_hosts: false,
        }
    }

    pub fn with_url_checks(mut self, validate_urls: bool, block_private_hosts: bool) -> Self {
        self.validate_urls = validate_urls;
        self.block_private_hosts = block_private_hosts;
        self
    }

    pub(crate) fn checks_urls(&self) -> bool {
        self.validate_urls || self.block_private_hosts
    }
}

/// Build the router. Every request runs inside a `tower-http` trace span;
/// the service operations open their own child spans.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/middletier/rss/user/:user",
            get(handlers::fetch_feeds)
                .post(handlers::subscribe)
                .delete(handlers::unsubscribe),
        )
        .route("/healthcheck", get(handlers::healthcheck))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
