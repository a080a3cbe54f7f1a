//! `ActivityPub` collection handlers (outbox, followers, following).
//!
//! Every collection is served as a stub carrying `totalItems` and a `first`
//! link, with pages behind an `after` cursor. The cursor is the last
//! returned item's id; pages filter strictly below it. A reserved
//! maximum-value cursor makes the first-page URI stable without colliding
//! with the stub URI.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use hivecache_common::MAX_ID;
use hivecache_db::repositories::{
    AccountRepository, BookmarkRepository, FollowerRepository, FollowingRepository,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info};
use url::Url;

use crate::activities::activity_context;
use crate::convert::{BookmarkToActivity, UrlConfig};
use crate::delivery::follower_addresses;
use hivecache_db::entities::account;

/// Items per collection page.
pub const PAGE_SIZE: u64 = 100;

/// State required for collection handlers.
#[derive(Clone)]
pub struct CollectionState {
    pub account_repo: AccountRepository,
    pub bookmark_repo: BookmarkRepository,
    pub follower_repo: FollowerRepository,
    pub following_repo: FollowingRepository,
    pub url_config: UrlConfig,
}

impl CollectionState {
    /// Create a new collection state.
    #[must_use]
    pub const fn new(
        account_repo: AccountRepository,
        bookmark_repo: BookmarkRepository,
        follower_repo: FollowerRepository,
        following_repo: FollowingRepository,
        base_url: Url,
    ) -> Self {
        Self {
            account_repo,
            bookmark_repo,
            follower_repo,
            following_repo,
            url_config: UrlConfig::new(base_url),
        }
    }
}

/// Query parameters for paginated collections.
#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    /// Cursor: page over items with id strictly below this value.
    pub after: Option<String>,
}

/// `ActivityPub` `OrderedCollection` stub.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollection {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Url,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<Url>,
}

/// `ActivityPub` `OrderedCollectionPage`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollectionPage {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Url,
    pub part_of: Url,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Url>,
    pub ordered_items: Vec<serde_json::Value>,
}

/// Plain `Collection` stub, used for the follower and following lists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Url,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<Url>,
}

/// Plain `CollectionPage` of account URIs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPage {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Url,
    pub part_of: Url,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Url>,
    pub items: Vec<serde_json::Value>,
}

/// Translate the `after` cursor into a repository filter. The reserved
/// maximum id means "start of collection" and maps to no filter.
fn page_cursor(after: &str) -> Option<&str> {
    if after == MAX_ID { None } else { Some(after) }
}

fn page_url(collection: &Url, cursor: &str) -> Url {
    let mut url = collection.clone();
    url.set_query(Some(&format!("after={cursor}")));
    url
}

fn first_page_url(collection: &Url) -> Url {
    page_url(collection, MAX_ID)
}

/// Handle GET /ap/u/{username}/outbox.
///
/// Without a cursor, returns an `OrderedCollection` stub. With `after`,
/// returns an `OrderedCollectionPage` of Create activities bundling the
/// account's public bookmarks, addressed with the current follower set.
/// `next` is present only when the page is full.
pub async fn outbox_handler(
    State(state): State<CollectionState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub outbox lookup");

    let account = match state
        .account_repo
        .find_by_username_and_host(&username, None)
        .await
    {
        Ok(Some(a)) => a,
        Ok(None) => {
            info!(username = %username, "Account not found");
            return (StatusCode::NOT_FOUND, "Account not found").into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch account");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let outbox_url = state.url_config.outbox_url(&account.username);

    if let Some(after) = query.after {
        let bookmarks = match state
            .bookmark_repo
            .find_public_by_account(&account.id, PAGE_SIZE, page_cursor(&after))
            .await
        {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "Failed to fetch bookmarks");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let followers = match state.follower_repo.find_follower_accounts(&account.id).await {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, "Failed to fetch followers");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };
        let follower_urls = follower_addresses(&followers);

        // Items inherit the page's @context.
        let items: Vec<serde_json::Value> = bookmarks
            .iter()
            .map(|bookmark| {
                let mut activity =
                    bookmark.to_create_activity(&state.url_config, &account, &follower_urls);
                activity.context = None;
                serde_json::to_value(&activity).unwrap_or_default()
            })
            .collect();

        let next = if bookmarks.len() == PAGE_SIZE as usize {
            bookmarks.last().map(|b| page_url(&outbox_url, &b.id))
        } else {
            None
        };

        let total_items = match state.bookmark_repo.count_public_by_account(&account.id).await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Failed to count bookmarks");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let page = OrderedCollectionPage {
            context: activity_context(),
            kind: "OrderedCollectionPage".to_string(),
            id: page_url(&outbox_url, &after),
            part_of: outbox_url,
            total_items,
            next,
            ordered_items: items,
        };

        return (
            StatusCode::OK,
            [("Content-Type", "application/activity+json; charset=utf-8")],
            Json(page),
        )
            .into_response();
    }

    let total_items = match state.bookmark_repo.count_public_by_account(&account.id).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to count bookmarks");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let collection = OrderedCollection {
        context: activity_context(),
        kind: "OrderedCollection".to_string(),
        id: outbox_url.clone(),
        total_items,
        first: Some(first_page_url(&outbox_url)),
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(collection),
    )
        .into_response()
}

/// Handle GET /ap/u/{username}/followers.
pub async fn followers_handler(
    State(state): State<CollectionState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub followers lookup");

    let account = match state
        .account_repo
        .find_by_username_and_host(&username, None)
        .await
    {
        Ok(Some(a)) => a,
        Ok(None) => {
            info!(username = %username, "Account not found");
            return (StatusCode::NOT_FOUND, "Account not found").into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch account");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let followers_url = state.url_config.followers_url(&account.username);

    if let Some(after) = query.after {
        let rows = match state
            .follower_repo
            .find_page(&account.id, PAGE_SIZE, page_cursor(&after))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "Failed to fetch followers");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let ids: Vec<String> = rows.iter().map(|f| f.follower_account_id.clone()).collect();
        let accounts = match state.account_repo.find_by_ids(&ids).await {
            Ok(a) => a,
            Err(e) => {
                error!(error = %e, "Failed to fetch follower accounts");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };
        let by_id: HashMap<&str, &account::Model> =
            accounts.iter().map(|a| (a.id.as_str(), a)).collect();

        // Page order comes from the follower rows, not the id lookup.
        let items: Vec<serde_json::Value> = rows
            .iter()
            .filter_map(|row| by_id.get(row.follower_account_id.as_str()))
            .map(|a| serde_json::json!(a.uri))
            .collect();

        let next = if rows.len() == PAGE_SIZE as usize {
            rows.last().map(|f| page_url(&followers_url, &f.id))
        } else {
            None
        };

        let total_items = match state.follower_repo.count_by_account(&account.id).await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Failed to count followers");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let page = CollectionPage {
            context: activity_context(),
            kind: "CollectionPage".to_string(),
            id: page_url(&followers_url, &after),
            part_of: followers_url,
            total_items,
            next,
            items,
        };

        return (
            StatusCode::OK,
            [("Content-Type", "application/activity+json; charset=utf-8")],
            Json(page),
        )
            .into_response();
    }

    let total_items = match state.follower_repo.count_by_account(&account.id).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to count followers");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let collection = Collection {
        context: activity_context(),
        kind: "Collection".to_string(),
        id: followers_url.clone(),
        total_items,
        first: Some(first_page_url(&followers_url)),
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(collection),
    )
        .into_response()
}

/// Handle GET /ap/u/{username}/following.
pub async fn following_handler(
    State(state): State<CollectionState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub following lookup");

    let account = match state
        .account_repo
        .find_by_username_and_host(&username, None)
        .await
    {
        Ok(Some(a)) => a,
        Ok(None) => {
            info!(username = %username, "Account not found");
            return (StatusCode::NOT_FOUND, "Account not found").into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch account");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let following_url = state.url_config.following_url(&account.username);

    if let Some(after) = query.after {
        let rows = match state
            .following_repo
            .find_page(&account.id, PAGE_SIZE, page_cursor(&after))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "Failed to fetch following");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let ids: Vec<String> = rows.iter().map(|f| f.target_account_id.clone()).collect();
        let accounts = match state.account_repo.find_by_ids(&ids).await {
            Ok(a) => a,
            Err(e) => {
                error!(error = %e, "Failed to fetch followed accounts");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };
        let by_id: HashMap<&str, &account::Model> =
            accounts.iter().map(|a| (a.id.as_str(), a)).collect();

        let items: Vec<serde_json::Value> = rows
            .iter()
            .filter_map(|row| by_id.get(row.target_account_id.as_str()))
            .map(|a| serde_json::json!(a.uri))
            .collect();

        let next = if rows.len() == PAGE_SIZE as usize {
            rows.last().map(|f| page_url(&following_url, &f.id))
        } else {
            None
        };

        let total_items = match state.following_repo.count_by_account(&account.id).await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Failed to count following");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let page = CollectionPage {
            context: activity_context(),
            kind: "CollectionPage".to_string(),
            id: page_url(&following_url, &after),
            part_of: following_url,
            total_items,
            next,
            items,
        };

        return (
            StatusCode::OK,
            [("Content-Type", "application/activity+json; charset=utf-8")],
            Json(page),
        )
            .into_response();
    }

    let total_items = match state.following_repo.count_by_account(&account.id).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to count following");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let collection = Collection {
        context: activity_context(),
        kind: "Collection".to_string(),
        id: following_url.clone(),
        total_items,
        first: Some(first_page_url(&following_url)),
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(collection),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use hivecache_db::entities::{bookmark, follower};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    fn test_account(id: &str, username: &str) -> account::Model {
        account::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: None,
            uri: format!("https://bookmarks.example/ap/u/{username}"),
            display_name: None,
            summary: None,
            inbox: format!("https://bookmarks.example/ap/u/{username}/inbox"),
            shared_inbox: None,
            outbox: None,
            followers_url: None,
            following_url: None,
            public_key_pem: "pem".to_string(),
            private_key_pem: Some("private pem".to_string()),
            last_fetched_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn remote_account(id: &str, username: &str) -> account::Model {
        account::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: Some("remote.example".to_string()),
            uri: format!("https://remote.example/users/{username}"),
            display_name: None,
            summary: None,
            inbox: format!("https://remote.example/users/{username}/inbox"),
            shared_inbox: None,
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

    fn test_bookmark(id: &str, account_id: &str) -> bookmark::Model {
        bookmark::Model {
            id: id.to_string(),
            account_id: account_id.to_string(),
            url: "https://blog.example/post".to_string(),
            title: "A post".to_string(),
            description: None,
            tags: serde_json::json!([]),
            main_image: None,
            is_public: true,
            source_uri: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn state(
        account_db: Arc<DatabaseConnection>,
        bookmark_db: Arc<DatabaseConnection>,
        follower_db: Arc<DatabaseConnection>,
        following_db: Arc<DatabaseConnection>,
    ) -> CollectionState {
        CollectionState::new(
            AccountRepository::new(account_db),
            BookmarkRepository::new(bookmark_db),
            FollowerRepository::new(follower_db),
            FollowingRepository::new(following_db),
            Url::parse("https://bookmarks.example").unwrap(),
        )
    }

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_page_cursor_treats_sentinel_as_start() {
        assert_eq!(page_cursor(MAX_ID), None);
        assert_eq!(page_cursor("01ARZ3NDEKTSV4RRFFQ69G5FAV"), Some("01ARZ3NDEKTSV4RRFFQ69G5FAV"));
    }

    #[test]
    fn test_first_page_url_uses_sentinel() {
        let collection = Url::parse("https://bookmarks.example/ap/u/alice/outbox").unwrap();
        let first = first_page_url(&collection);
        assert_eq!(first.query(), Some(format!("after={MAX_ID}").as_str()));
    }

    #[tokio::test]
    async fn test_outbox_stub_reports_totals() {
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_account("a1", "alice")]])
                .into_connection(),
        );
        let bookmark_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let response = outbox_handler(
            State(state(account_db, bookmark_db, empty_db(), empty_db())),
            Path("alice".to_string()),
            Query(CollectionQuery { after: None }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["type"], "OrderedCollection");
        assert_eq!(json["totalItems"], 3);
        assert_eq!(
            json["first"],
            format!("https://bookmarks.example/ap/u/alice/outbox?after={MAX_ID}")
        );
    }

    #[tokio::test]
    async fn test_outbox_page_bundles_public_bookmarks() {
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_account("a1", "alice")]])
                .into_connection(),
        );
        let bookmark_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_bookmark("b2", "a1"), test_bookmark("b1", "a1")]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .into_connection(),
        );
        let follower_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follower::Model>::new()])
                .into_connection(),
        );

        let response = outbox_handler(
            State(state(account_db, bookmark_db, follower_db, empty_db())),
            Path("alice".to_string()),
            Query(CollectionQuery {
                after: Some(MAX_ID.to_string()),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["type"], "OrderedCollectionPage");
        assert_eq!(
            json["partOf"],
            "https://bookmarks.example/ap/u/alice/outbox"
        );
        let items = json["orderedItems"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "Create");
        assert_eq!(
            items[0]["object"]["id"],
            "https://bookmarks.example/bookmarks/b2"
        );
        // Fewer items than the page size means no next link.
        assert!(json.get("next").is_none());
    }

    #[tokio::test]
    async fn test_followers_page_preserves_row_order() {
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_account("a1", "alice")]])
                .append_query_results([[remote_account("a3", "carol"), remote_account("a2", "bob")]])
                .into_connection(),
        );
        let follower_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    follower::Model {
                        id: "f2".to_string(),
                        account_id: "a1".to_string(),
                        follower_account_id: "a2".to_string(),
                        created_at: Utc::now().into(),
                    },
                    follower::Model {
                        id: "f1".to_string(),
                        account_id: "a1".to_string(),
                        follower_account_id: "a3".to_string(),
                        created_at: Utc::now().into(),
                    },
                ]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .into_connection(),
        );

        let response = followers_handler(
            State(state(account_db, empty_db(), follower_db, empty_db())),
            Path("alice".to_string()),
            Query(CollectionQuery {
                after: Some(MAX_ID.to_string()),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["type"], "CollectionPage");
        let items = json["items"].as_array().unwrap();
        assert_eq!(
            items,
            &vec![
                serde_json::json!("https://remote.example/users/bob"),
                serde_json::json!("https://remote.example/users/carol"),
            ]
        );
        assert!(json.get("next").is_none());
    }

    #[tokio::test]
    async fn test_outbox_unknown_account_is_not_found() {
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<account::Model>::new()])
                .into_connection(),
        );

        let response = outbox_handler(
            State(state(account_db, empty_db(), empty_db(), empty_db())),
            Path("ghost".to_string()),
            Query(CollectionQuery { after: None }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
