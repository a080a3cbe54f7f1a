//! `ActivityPub` Note object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::activities::PUBLIC_ADDRESS;

/// `ActivityPub` Note object.
///
/// Bookmarks federate as Notes whose HTML content carries the bookmarked
/// link. The type is kept as a plain string so payloads with an unexpected
/// object type surface as a domain error rather than a parse failure.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApNote {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Url,
    pub attributed_to: Url,
    pub content: String,
    pub published: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<Url>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<Url>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<ApTag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Vec<ApAttachment>>,
}

impl ApNote {
    /// Whether the note is addressed to the public collection.
    #[must_use]
    pub fn is_public(&self) -> bool {
        let targets = |urls: &Option<Vec<Url>>| {
            urls.as_deref()
                .unwrap_or_default()
                .iter()
                .any(|u| u.as_str() == PUBLIC_ADDRESS)
        };
        targets(&self.to) || targets(&self.cc)
    }
}

/// Tag attached to a Note, usually a `Hashtag`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApTag {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Media attachment on a Note.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(to: Option<Vec<&str>>, cc: Option<Vec<&str>>) -> ApNote {
        let parse = |urls: Option<Vec<&str>>| {
            urls.map(|list| list.into_iter().map(|u| Url::parse(u).unwrap()).collect())
        };
        ApNote {
            kind: "Note".to_string(),
            id: Url::parse("https://remote.example/notes/1").unwrap(),
            attributed_to: Url::parse("https://remote.example/users/bob").unwrap(),
            content: String::new(),
            published: Utc::now(),
            to: parse(to),
            cc: parse(cc),
            summary: None,
            tag: None,
            attachment: None,
        }
    }

    #[test]
    fn test_is_public_checks_to_and_cc() {
        assert!(note(Some(vec![PUBLIC_ADDRESS]), None).is_public());
        assert!(note(None, Some(vec![PUBLIC_ADDRESS])).is_public());
        assert!(
            !note(
                Some(vec!["https://remote.example/users/bob/followers"]),
                None
            )
            .is_public()
        );
        assert!(!note(None, None).is_public());
    }
}
