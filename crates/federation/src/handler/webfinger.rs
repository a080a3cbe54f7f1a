//! WebFinger handler for actor discovery.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use hivecache_db::repositories::AccountRepository;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::convert::UrlConfig;
use crate::objects::{WebfingerDocument, WebfingerLink};

/// WebFinger query parameters.
#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    pub resource: String,
}

/// State required for the WebFinger handler.
#[derive(Clone)]
pub struct WebfingerState {
    pub account_repo: AccountRepository,
    pub url_config: UrlConfig,
}

impl WebfingerState {
    /// Create a new WebFinger handler state.
    #[must_use]
    pub const fn new(account_repo: AccountRepository, base_url: Url) -> Self {
        Self {
            account_repo,
            url_config: UrlConfig::new(base_url),
        }
    }
}

/// Parse an `acct:username@domain` resource URI.
fn parse_acct(resource: &str) -> Option<(String, String)> {
    let rest = resource.strip_prefix("acct:")?;
    let parts: Vec<&str> = rest.split('@').collect();
    if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
        Some((parts[0].to_string(), parts[1].to_string()))
    } else {
        None
    }
}

/// Handle WebFinger requests.
///
/// WebFinger is used to discover `ActivityPub` actors from their handle.
/// Example: `/.well-known/webfinger?resource=acct:user@example.com`
pub async fn webfinger_handler(
    State(state): State<WebfingerState>,
    Query(query): Query<WebfingerQuery>,
) -> impl IntoResponse {
    info!(resource = %query.resource, "WebFinger lookup");

    let Some((username, domain)) = parse_acct(&query.resource) else {
        return (StatusCode::BAD_REQUEST, "Invalid resource format").into_response();
    };

    if !domain.eq_ignore_ascii_case(state.url_config.host()) {
        return (StatusCode::NOT_FOUND, "Unknown domain").into_response();
    }

    let account = match state
        .account_repo
        .find_by_username_and_host(&username, None)
        .await
    {
        Ok(Some(a)) => a,
        Ok(None) => {
            info!(username = %username, "Account not found for WebFinger");
            return (StatusCode::NOT_FOUND, "Account not found").into_response();
        }
        Err(e) => {
            warn!(error = %e, "Database error during WebFinger lookup");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let actor_url = state.url_config.user_url(&account.username);
    let profile_url = state.url_config.profile_url(&account.username);

    let document = WebfingerDocument {
        subject: query.resource.clone(),
        aliases: vec![actor_url.to_string(), profile_url.to_string()],
        links: vec![
            WebfingerLink {
                rel: "self".to_string(),
                link_type: Some("application/activity+json".to_string()),
                href: Some(actor_url.to_string()),
                template: None,
            },
            WebfingerLink {
                rel: "http://webfinger.net/rel/profile-page".to_string(),
                link_type: Some("text/html".to_string()),
                href: Some(profile_url.to_string()),
                template: None,
            },
        ],
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/jrd+json")],
        Json(document),
    )
        .into_response()
}
