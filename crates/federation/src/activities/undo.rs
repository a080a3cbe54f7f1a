//! Undo activity.

use activitypub_federation::kinds::activity::UndoType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::FollowActivity;

/// `ActivityPub` Undo activity retracting a Follow.
///
/// The object is the original Follow; the Undo's actor is always the actor
/// of that inner activity.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoActivity {
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "type")]
    pub kind: UndoType,
    pub id: Url,
    pub actor: Url,
    pub object: FollowActivity,
}
