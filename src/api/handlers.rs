use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::{Form, Json};
use serde::Deserialize;

use super::error::ApiResult;
use super::AppState;
use crate::feed::FeedCollection;
use crate::util::validate_feed_url;

/// The `url` field of subscribe/unsubscribe requests.
///
/// Accepted from an `application/x-www-form-urlencoded` body or from the
/// query string; a non-empty body value wins.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscriptionForm {
    pub url: String,
}

impl SubscriptionForm {
    /// Pick the body value when it carries one, the query value otherwise.
    pub fn resolve(query: SubscriptionForm, body: Option<SubscriptionForm>) -> String {
        match body {
            Some(body) if !body.url.is_empty() => body.url,
            _ => query.url,
        }
    }
}

/// `GET /middletier/rss/user/:user`
pub async fn fetch_feeds(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<FeedCollection>> {
    let collection = state.service.fetch_feeds(&user).await?;
    Ok(Json(collection))
}

/// `POST /middletier/rss/user/:user`
pub async fn subscribe(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<SubscriptionForm>,
    body: Option<Form<SubscriptionForm>>,
) -> ApiResult<StatusCode> {
    let url = SubscriptionForm::resolve(query, body.map(|Form(f)| f));
    if state.checks_urls() {
        validate_feed_url(&url, state.block_private_hosts)?;
    }
    // Surrounding whitespace is dropped; the rest is stored verbatim
    state.service.subscribe(&user, url.trim()).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /middletier/rss/user/:user`
///
/// Never validated, so any stored text can be removed again.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<SubscriptionForm>,
    body: Option<Form<SubscriptionForm>>,
) -> ApiResult<StatusCode> {
    let url = SubscriptionForm::resolve(query, body.map(|Form(f)| f));
    state.service.unsubscribe(&user, url.trim()).await?;
    Ok(StatusCode::OK)
}

/// `GET /healthcheck`
pub async fn healthcheck() -> Html<&'static str> {
    Html("<h1>Healthcheck page</h1>")
}
