//! Follow activity.

use activitypub_federation::kinds::activity::FollowType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// `ActivityPub` Follow activity.
///
/// The id embeds the local follow relationship's id as its URL fragment, so
/// an echoed copy inside an Accept or Undo correlates back to the stored row.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowActivity {
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "type")]
    pub kind: FollowType,
    pub id: Url,
    /// Actor performing the follow.
    pub actor: Url,
    /// Actor being followed.
    pub object: Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization() {
        let follow = FollowActivity {
            context: None,
            kind: FollowType::Follow,
            id: Url::parse("https://bookmarks.example/ap/u/alice/outbox#01hx").unwrap(),
            actor: Url::parse("https://bookmarks.example/ap/u/alice").unwrap(),
            object: Url::parse("https://remote.example/users/bob").unwrap(),
        };

        let json = serde_json::to_value(&follow).unwrap();
        assert_eq!(json["type"], "Follow");
        assert_eq!(json["actor"], "https://bookmarks.example/ap/u/alice");
        assert_eq!(json["object"], "https://remote.example/users/bob");
        assert!(json.get("@context").is_none());
    }

    #[test]
    fn test_deserialization_rejects_other_types() {
        let json = serde_json::json!({
            "type": "Like",
            "id": "https://remote.example/activities/1",
            "actor": "https://remote.example/users/bob",
            "object": "https://bookmarks.example/ap/u/alice"
        });

        assert!(serde_json::from_value::<FollowActivity>(json).is_err());
    }
}
