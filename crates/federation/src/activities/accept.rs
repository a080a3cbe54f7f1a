//! Accept activity.

use activitypub_federation::kinds::activity::AcceptType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::FollowActivity;

/// `ActivityPub` Accept activity confirming a Follow.
///
/// The object is the full Follow being accepted, echoed back so the other
/// side can correlate it with its pending request.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptActivity {
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "type")]
    pub kind: AcceptType,
    pub id: Url,
    pub actor: Url,
    pub object: FollowActivity,
}
