//! Account to `ActivityPub` Person conversion.

#![allow(clippy::expect_used)] // URL joins with known-valid paths cannot fail

use activitypub_federation::kinds::actor::PersonType;
use hivecache_db::entities::account;
use serde_json::json;
use url::Url;

use crate::actors::{ApEndpoints, ApPerson, ApPublicKey};

/// Builds the URLs under which local accounts and their collections are
/// served.
#[derive(Clone)]
pub struct UrlConfig {
    pub base_url: Url,
}

impl UrlConfig {
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Host component of the local instance.
    #[must_use]
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or("")
    }

    /// Actor URL for a local username.
    #[must_use]
    pub fn user_url(&self, username: &str) -> Url {
        self.base_url
            .join(&format!("/ap/u/{username}"))
            .expect("valid URL")
    }

    /// Inbox URL for a local username.
    #[must_use]
    pub fn inbox_url(&self, username: &str) -> Url {
        self.base_url
            .join(&format!("/ap/u/{username}/inbox"))
            .expect("valid URL")
    }

    /// Outbox URL for a local username.
    #[must_use]
    pub fn outbox_url(&self, username: &str) -> Url {
        self.base_url
            .join(&format!("/ap/u/{username}/outbox"))
            .expect("valid URL")
    }

    /// Followers collection URL for a local username.
    #[must_use]
    pub fn followers_url(&self, username: &str) -> Url {
        self.base_url
            .join(&format!("/ap/u/{username}/followers"))
            .expect("valid URL")
    }

    /// Following collection URL for a local username.
    #[must_use]
    pub fn following_url(&self, username: &str) -> Url {
        self.base_url
            .join(&format!("/ap/u/{username}/following"))
            .expect("valid URL")
    }

    /// Instance-wide shared inbox URL.
    #[must_use]
    pub fn shared_inbox_url(&self) -> Url {
        self.base_url.join("/ap/inbox").expect("valid URL")
    }

    /// Canonical URL of a bookmark's federated Note.
    #[must_use]
    pub fn bookmark_url(&self, bookmark_id: &str) -> Url {
        self.base_url
            .join(&format!("/bookmarks/{bookmark_id}"))
            .expect("valid URL")
    }

    /// Tag browsing URL, linked from rendered Note content.
    #[must_use]
    pub fn tag_url(&self, slug: &str) -> Url {
        self.base_url.join(&format!("/t/{slug}")).expect("valid URL")
    }

    /// Profile page URL for a local username.
    #[must_use]
    pub fn profile_url(&self, username: &str) -> Url {
        self.base_url
            .join(&format!("/@{username}"))
            .expect("valid URL")
    }

    /// Signing key URL for a local username.
    #[must_use]
    pub fn public_key_url(&self, username: &str) -> String {
        format!("{}#main-key", self.user_url(username))
    }
}

/// Extension trait for rendering accounts as actor documents.
pub trait AccountToApPerson {
    /// Render as an `ActivityPub` Person.
    fn to_ap_person(&self, config: &UrlConfig) -> ApPerson;
}

impl AccountToApPerson for account::Model {
    fn to_ap_person(&self, config: &UrlConfig) -> ApPerson {
        let id = config.user_url(&self.username);

        ApPerson {
            context: Some(json!([
                "https://www.w3.org/ns/activitystreams",
                "https://w3id.org/security/v1"
            ])),
            kind: PersonType::Person,
            id: id.clone(),
            preferred_username: self.username.clone(),
            inbox: config.inbox_url(&self.username),
            outbox: Some(config.outbox_url(&self.username)),
            name: self.display_name.clone(),
            summary: self.summary.clone(),
            followers: Some(config.followers_url(&self.username)),
            following: Some(config.following_url(&self.username)),
            shared_inbox: None,
            endpoints: Some(ApEndpoints {
                shared_inbox: Some(config.shared_inbox_url()),
            }),
            public_key: Some(ApPublicKey {
                id: config.public_key_url(&self.username),
                owner: id,
                public_key_pem: self.public_key_pem.clone(),
            }),
        }
    }
}
