//! `ActivityPub` Person actor.

use activitypub_federation::kinds::actor::PersonType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// `ActivityPub` Person actor document.
///
/// Served for local accounts and parsed from remote instances. Remote
/// documents carry many extension fields; everything not modeled here is
/// ignored on deserialization.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApPerson {
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "type")]
    pub kind: PersonType,
    pub id: Url,
    pub preferred_username: String,
    pub inbox: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<Url>,
    /// Legacy top-level shared inbox; `endpoints.sharedInbox` is preferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_inbox: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<ApEndpoints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<ApPublicKey>,
}

impl ApPerson {
    /// The actor's shared inbox, preferring the `endpoints` map over the
    /// legacy top-level field.
    #[must_use]
    pub fn shared_inbox(&self) -> Option<&Url> {
        self.endpoints
            .as_ref()
            .and_then(|e| e.shared_inbox.as_ref())
            .or(self.shared_inbox.as_ref())
    }
}

/// Per-actor endpoint map.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApEndpoints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_inbox: Option<Url>,
}

/// Public key advertised in an actor document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApPublicKey {
    pub id: String,
    pub owner: Url,
    pub public_key_pem: String,
}
