//! `ActivityPub` actor (Person) endpoint handler.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use hivecache_db::repositories::AccountRepository;
use tracing::{error, info};
use url::Url;

use crate::convert::{AccountToApPerson, UrlConfig};

/// State required for the actor document handler.
#[derive(Clone)]
pub struct ActorState {
    pub account_repo: AccountRepository,
    pub url_config: UrlConfig,
}

impl ActorState {
    /// Create a new actor handler state.
    #[must_use]
    pub const fn new(account_repo: AccountRepository, base_url: Url) -> Self {
        Self {
            account_repo,
            url_config: UrlConfig::new(base_url),
        }
    }
}

/// Handle GET /ap/u/{username} for `ActivityPub` Person retrieval.
///
/// Only local accounts are served; remote accounts must be fetched from
/// their origin server and resolve to 404 here.
pub async fn actor_handler(
    State(state): State<ActorState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub actor lookup");

    let account = match state
        .account_repo
        .find_by_username_and_host(&username, None)
        .await
    {
        Ok(Some(a)) => a,
        Ok(None) => {
            info!(username = %username, "Account not found");
            return (StatusCode::NOT_FOUND, "Account not found").into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch account");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let person = account.to_ap_person(&state.url_config);

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(person),
    )
        .into_response()
}
