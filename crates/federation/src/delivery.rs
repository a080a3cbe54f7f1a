//! Delivery fan-out planning.
//!
//! Computes recipient sets for outbound activities. Queueing and the signed
//! POSTs themselves live with the queue workers.

use hivecache_db::entities::account;
use tracing::{info, warn};
use url::Url;

/// Distinct shared-inbox URLs across a follower set, one delivery per
/// instance.
///
/// Followers without a shared inbox are skipped with a warning.
#[must_use]
pub fn collect_shared_inboxes(followers: &[account::Model]) -> Vec<String> {
    let mut inboxes: Vec<String> = Vec::new();

    for follower in followers {
        match follower.shared_inbox {
            Some(ref shared) => {
                if !inboxes.contains(shared) {
                    inboxes.push(shared.clone());
                }
            }
            None => warn!(
                account_id = %follower.id,
                uri = %follower.uri,
                "Follower has no shared inbox, skipping delivery"
            ),
        }
    }

    info!(
        followers = followers.len(),
        inboxes = inboxes.len(),
        "Planned delivery fan-out"
    );
    inboxes
}

/// Distinct follower account URIs, for activity addressing.
///
/// Rows with an unparseable URI are skipped with a warning.
#[must_use]
pub fn follower_addresses(followers: &[account::Model]) -> Vec<Url> {
    let mut addresses: Vec<Url> = Vec::new();

    for follower in followers {
        match Url::parse(&follower.uri) {
            Ok(url) => {
                if !addresses.contains(&url) {
                    addresses.push(url);
                }
            }
            Err(e) => warn!(
                account_id = %follower.id,
                uri = %follower.uri,
                error = %e,
                "Follower has an unparseable URI"
            ),
        }
    }

    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn remote_account(id: &str, username: &str, shared_inbox: Option<&str>) -> account::Model {
        account::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: Some("remote.example".to_string()),
            uri: format!("https://remote.example/users/{username}"),
            display_name: None,
            summary: None,
            inbox: format!("https://remote.example/users/{username}/inbox"),
            shared_inbox: shared_inbox.map(ToString::to_string),
            outbox: None,
            followers_url: None,
            following_url: None,
            public_key_pem: "pem".to_string(),
            private_key_pem: None,
            last_fetched_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_shared_inboxes_are_deduplicated_per_instance() {
        let followers = vec![
            remote_account("01a", "bob", Some("https://remote.example/inbox")),
            remote_account("01b", "carol", Some("https://remote.example/inbox")),
            remote_account("01c", "dan", Some("https://other.example/inbox")),
        ];

        let inboxes = collect_shared_inboxes(&followers);
        assert_eq!(
            inboxes,
            vec![
                "https://remote.example/inbox".to_string(),
                "https://other.example/inbox".to_string(),
            ]
        );
    }

    #[test]
    fn test_followers_without_shared_inbox_are_skipped() {
        let followers = vec![
            remote_account("01a", "bob", None),
            remote_account("01b", "carol", Some("https://remote.example/inbox")),
        ];

        let inboxes = collect_shared_inboxes(&followers);
        assert_eq!(inboxes, vec!["https://remote.example/inbox".to_string()]);
    }

    #[test]
    fn test_follower_addresses_are_distinct() {
        let mut duplicate = remote_account("01b", "bob", None);
        duplicate.id = "01c".to_string();

        let followers = vec![
            remote_account("01a", "bob", None),
            duplicate,
            remote_account("01d", "carol", None),
        ];

        let addresses = follower_addresses(&followers);
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].as_str(), "https://remote.example/users/bob");
        assert_eq!(addresses[1].as_str(), "https://remote.example/users/carol");
    }
}
