//! WebFinger JRD documents.

use serde::{Deserialize, Serialize};

/// A WebFinger JRD document, both served for local accounts and parsed when
/// resolving remote handles.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WebfingerDocument {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<WebfingerLink>,
}

/// A link inside a WebFinger document.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WebfingerLink {
    pub rel: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl WebfingerDocument {
    /// The `self` link pointing at the actor document, if any.
    #[must_use]
    pub fn actor_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| {
                link.rel == "self"
                    && link
                        .link_type
                        .as_deref()
                        .is_some_and(|t| t.contains("activity+json"))
            })
            .and_then(|link| link.href.as_deref())
    }
}
