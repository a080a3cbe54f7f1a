//! Inbox handlers for receiving `ActivityPub` activities.
//!
//! POST deliveries are authenticated here and enqueued for the inbox
//! worker; nothing from the payload is trusted before the HTTP signature,
//! `Date` window, and `Digest` all check out. GET requests on inbox URLs
//! get an empty collection placeholder.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hivecache_common::AppResult;
use hivecache_db::repositories::AccountRepository;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use super::collections::OrderedCollection;
use crate::activities::activity_context;
use crate::convert::UrlConfig;
use crate::processor::AccountFetcher;
use crate::signature::{
    DEFAULT_MAX_CLOCK_SKEW_SECS, HttpVerifier, validate_date, verify_digest,
};

/// A verified inbound delivery, captured for the inbox worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEnvelope {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Hands verified deliveries off for asynchronous processing.
#[async_trait]
pub trait InboxEnqueue: Send + Sync {
    async fn enqueue(&self, envelope: InboxEnvelope) -> AppResult<()>;
}

/// State required for the inbox handlers.
#[derive(Clone)]
pub struct InboxState {
    pub account_repo: AccountRepository,
    pub fetcher: AccountFetcher,
    pub queue: Arc<dyn InboxEnqueue>,
    pub url_config: UrlConfig,
}

impl InboxState {
    /// Create a new inbox handler state.
    #[must_use]
    pub fn new(
        account_repo: AccountRepository,
        fetcher: AccountFetcher,
        queue: Arc<dyn InboxEnqueue>,
        base_url: Url,
    ) -> Self {
        Self {
            account_repo,
            fetcher,
            queue,
            url_config: UrlConfig::new(base_url),
        }
    }
}

/// Handle POST /ap/inbox (shared inbox).
pub async fn shared_inbox_handler(
    State(state): State<InboxState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    info!("Shared inbox delivery");
    accept_delivery(&state, &uri, &headers, body).await
}

/// Handle POST /ap/u/{username}/inbox.
pub async fn user_inbox_handler(
    State(state): State<InboxState>,
    Path(username): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    info!(username = %username, "User inbox delivery");

    match state
        .account_repo
        .find_by_username_and_host(&username, None)
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            info!(username = %username, "Account not found");
            return (StatusCode::NOT_FOUND, "Account not found").into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch account");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    }

    accept_delivery(&state, &uri, &headers, body).await
}

/// Handle GET /ap/u/{username}/inbox.
///
/// Some remote software probes inbox URLs with a GET; answer with an
/// empty collection rather than an error.
pub async fn user_inbox_collection_handler(
    State(state): State<InboxState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    empty_collection(state.url_config.inbox_url(&username))
}

/// Handle GET /ap/inbox.
pub async fn shared_inbox_collection_handler(
    State(state): State<InboxState>,
) -> impl IntoResponse {
    empty_collection(state.url_config.shared_inbox_url())
}

fn empty_collection(id: Url) -> axum::response::Response {
    let collection = OrderedCollection {
        context: activity_context(),
        kind: "OrderedCollection".to_string(),
        id,
        total_items: 0,
        first: None,
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(collection),
    )
        .into_response()
}

async fn accept_delivery(
    state: &InboxState,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let target = request_target(uri);

    if let Err((status, reason)) = verify_request(state, &target, headers, &body).await {
        warn!(path = %target, reason, "Rejected inbox delivery");
        return (status, reason).into_response();
    }

    let Ok(body) = String::from_utf8(body.to_vec()) else {
        return (StatusCode::BAD_REQUEST, "Body is not valid UTF-8").into_response();
    };

    let envelope = InboxEnvelope {
        method: "POST".to_string(),
        path: uri.path().to_string(),
        headers: flatten_headers(headers),
        body,
    };

    match state.queue.enqueue(envelope).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to enqueue inbound activity");
            (StatusCode::INTERNAL_SERVER_ERROR, "Queue error").into_response()
        }
    }
}

/// Authenticate a delivery before anything in its payload is used.
///
/// The signing key is resolved through the account cache, fetching the
/// actor document on a miss, so first contact from a new server works.
async fn verify_request(
    state: &InboxState,
    target: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), (StatusCode, &'static str)> {
    let Some(signature_header) = headers.get("signature").and_then(|v| v.to_str().ok()) else {
        return Err((StatusCode::UNAUTHORIZED, "Missing Signature header"));
    };
    let Ok(components) = HttpVerifier::parse_signature_header(signature_header) else {
        return Err((StatusCode::BAD_REQUEST, "Invalid Signature header"));
    };

    let Some(date_header) = headers.get("date").and_then(|v| v.to_str().ok()) else {
        return Err((StatusCode::UNAUTHORIZED, "Missing Date header"));
    };
    if validate_date(date_header, DEFAULT_MAX_CLOCK_SKEW_SECS).is_err() {
        return Err((StatusCode::UNAUTHORIZED, "Date outside the accepted window"));
    }

    let Some(digest_header) = headers.get("digest").and_then(|v| v.to_str().ok()) else {
        return Err((StatusCode::UNAUTHORIZED, "Missing Digest header"));
    };
    if !verify_digest(body, digest_header) {
        return Err((StatusCode::UNAUTHORIZED, "Digest mismatch"));
    }

    let actor_uri = components
        .key_id
        .split('#')
        .next()
        .unwrap_or(&components.key_id);
    let Ok(actor_url) = Url::parse(actor_uri) else {
        return Err((StatusCode::BAD_REQUEST, "Invalid keyId"));
    };

    let account = match state.fetcher.find_or_fetch(&actor_url).await {
        Ok(a) => a,
        Err(e) => {
            warn!(error = %e, key_id = %components.key_id, "Could not resolve signing actor");
            return Err((StatusCode::UNAUTHORIZED, "Could not resolve signing actor"));
        }
    };

    let verify_headers = flatten_headers(headers);
    match HttpVerifier::verify(
        &account.public_key_pem,
        &components,
        "POST",
        target,
        &verify_headers,
    ) {
        Ok(true) => {
            debug!(key_id = %components.key_id, "Signature verified");
            Ok(())
        }
        Ok(false) => Err((StatusCode::UNAUTHORIZED, "Invalid signature")),
        Err(e) => {
            warn!(error = %e, "Signature verification error");
            Err((StatusCode::UNAUTHORIZED, "Signature verification failed"))
        }
    }
}

fn request_target(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{query}", uri.path()),
        None => uri.path().to_string(),
    }
}

fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
