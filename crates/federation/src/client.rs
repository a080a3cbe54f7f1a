//! HTTP client for `ActivityPub` requests.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::signature::{HttpSigner, SignatureError};

const ACCEPT_ACTIVITY_JSON: &str =
    "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";
const ACCEPT_JRD_JSON: &str = "application/jrd+json, application/json";
const CONTENT_TYPE_ACTIVITY_JSON: &str = "application/activity+json; charset=utf-8";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from federation HTTP requests.
#[derive(Debug, thiserror::Error)]
pub enum ApClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignatureError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed with status {status}: {body}")]
    FetchFailed { status: u16, body: String },

    #[error("Delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },
}

impl ApClientError {
    /// HTTP status carried by the error, when the remote side answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::FetchFailed { status, .. } | Self::DeliveryFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client for fetching remote `ActivityPub` resources and delivering
/// activities.
///
/// Fetches are signed with the configured signer when one is attached, for
/// peers that reject unsigned GETs. Deliveries are always signed with the
/// key passed per call.
#[derive(Clone)]
pub struct ApClient {
    client: Client,
    user_agent: String,
    signer: Option<Arc<HttpSigner>>,
}

impl ApClient {
    /// Create a client with the given `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ApClientError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(user_agent: impl Into<String>) -> Result<Self, ApClientError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            user_agent: user_agent.into(),
            signer: None,
        })
    }

    /// Attach a signer used for outbound GETs.
    #[must_use]
    pub fn with_signer(mut self, signer: HttpSigner) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Fetch a remote actor document.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-success responses.
    pub async fn fetch_actor(&self, actor_url: &str) -> Result<Value, ApClientError> {
        debug!(url = %actor_url, "Fetching remote actor");
        self.get_json(actor_url, ACCEPT_ACTIVITY_JSON).await
    }

    /// Resolve `username@host` through the remote instance's WebFinger
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-success responses.
    pub async fn webfinger(&self, username: &str, host: &str) -> Result<Value, ApClientError> {
        let url =
            format!("https://{host}/.well-known/webfinger?resource=acct:{username}@{host}");
        debug!(url = %url, "WebFinger lookup");
        self.get_json(&url, ACCEPT_JRD_JSON).await
    }

    /// Deliver an activity to a remote inbox, signed with `signer`.
    ///
    /// A `410 Gone` response counts as delivered: the target has withdrawn
    /// and retrying cannot help.
    ///
    /// # Errors
    ///
    /// Returns [`ApClientError::DeliveryFailed`] for other non-success
    /// statuses, leaving retry classification to the caller.
    pub async fn deliver(
        &self,
        inbox_url: &str,
        activity: &Value,
        signer: &HttpSigner,
    ) -> Result<(), ApClientError> {
        let url =
            Url::parse(inbox_url).map_err(|e| ApClientError::InvalidUrl(e.to_string()))?;
        let body = serde_json::to_vec(activity)?;

        let headers = signer.sign_request("POST", &url, Some(&body))?;

        let response = self
            .client
            .post(url)
            .headers(headers)
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", CONTENT_TYPE_ACTIVITY_JSON)
            .header("Accept", ACCEPT_ACTIVITY_JSON)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(inbox = %inbox_url, status = %status, "Activity delivered");
            return Ok(());
        }
        if status.as_u16() == 410 {
            warn!(inbox = %inbox_url, "Inbox is gone, treating delivery as done");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApClientError::DeliveryFailed {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json(&self, url: &str, accept: &str) -> Result<Value, ApClientError> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", accept);

        if let Some(ref signer) = self.signer {
            let parsed =
                Url::parse(url).map_err(|e| ApClientError::InvalidUrl(e.to_string()))?;
            let headers = signer.sign_request("GET", &parsed, None)?;
            request = request.headers(headers);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApClientError::FetchFailed {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
