//! Bookmark service.

use crate::services::delivery::DeliveryService;
use hivecache_common::{AppError, AppResult, IdGenerator};
use hivecache_db::{
    entities::bookmark,
    repositories::{AccountRepository, BookmarkRepository},
};
use sea_orm::Set;
use serde::Deserialize;

/// Input for creating a bookmark.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookmarkInput {
    /// The bookmarked URL.
    pub url: String,
    /// Title of the bookmarked page.
    pub title: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tag slugs.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional preview image URL.
    #[serde(default)]
    pub main_image: Option<String>,
    /// Whether the bookmark is publicly visible and federated.
    #[serde(default = "default_public")]
    pub is_public: bool,
}

const fn default_public() -> bool {
    true
}

/// Bookmark service for business logic.
#[derive(Clone)]
pub struct BookmarkService {
    bookmark_repo: BookmarkRepository,
    account_repo: AccountRepository,
    delivery: Option<DeliveryService>,
    id_gen: IdGenerator,
}

impl BookmarkService {
    /// Create a new bookmark service.
    #[must_use]
    pub fn new(bookmark_repo: BookmarkRepository, account_repo: AccountRepository) -> Self {
        Self {
            bookmark_repo,
            account_repo,
            delivery: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new bookmark service with `ActivityPub` delivery support.
    #[must_use]
    pub fn with_delivery(
        bookmark_repo: BookmarkRepository,
        account_repo: AccountRepository,
        delivery: DeliveryService,
    ) -> Self {
        Self {
            bookmark_repo,
            account_repo,
            delivery: Some(delivery),
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the delivery service.
    pub fn set_delivery(&mut self, delivery: DeliveryService) {
        self.delivery = Some(delivery);
    }

    /// Create a bookmark for a local account.
    ///
    /// Public bookmarks are queued for delivery to the account's followers.
    pub async fn create(
        &self,
        account_id: &str,
        input: CreateBookmarkInput,
    ) -> AppResult<bookmark::Model> {
        if input.url.trim().is_empty() {
            return Err(AppError::BadRequest("URL is required".to_string()));
        }
        if input.title.trim().is_empty() {
            return Err(AppError::BadRequest("Title is required".to_string()));
        }

        let account = self.account_repo.get_by_id(account_id).await?;
        if !account.is_local() {
            return Err(AppError::Forbidden(
                "Only local accounts can create bookmarks".to_string(),
            ));
        }

        let model = bookmark::ActiveModel {
            id: Set(self.id_gen.generate()),
            account_id: Set(account.id),
            url: Set(input.url.trim().to_string()),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            tags: Set(serde_json::json!(input.tags)),
            main_image: Set(input.main_image),
            is_public: Set(input.is_public),
            source_uri: Set(None),
            ..Default::default()
        };

        let bookmark = self.bookmark_repo.create(model).await?;

        // Queue ActivityPub Create activity for public bookmarks
        if bookmark.is_public
            && let Some(ref delivery) = self.delivery
            && let Err(e) = delivery.queue_create_bookmark(&bookmark).await
        {
            tracing::warn!(error = %e, bookmark_id = %bookmark.id, "Failed to queue Create activity");
        }

        Ok(bookmark)
    }

    /// Get a bookmark by ID.
    pub async fn get(&self, id: &str) -> AppResult<bookmark::Model> {
        self.bookmark_repo.get_by_id(id).await
    }

    /// Get the public bookmarks of an account, newest first.
    pub async fn list_public(
        &self,
        account_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<bookmark::Model>> {
        self.bookmark_repo
            .find_public_by_account(account_id, limit, until_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::delivery::NoOpDelivery;
    use chrono::Utc;
    use hivecache_db::entities::account;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_account(id: &str) -> account::Model {
        account::Model {
            id: id.to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            host: None,
            uri: "https://bookmarks.example/ap/u/alice".to_string(),
            display_name: None,
            summary: None,
            inbox: "https://bookmarks.example/ap/u/alice/inbox".to_string(),
            shared_inbox: Some("https://bookmarks.example/ap/inbox".to_string()),
            outbox: Some("https://bookmarks.example/ap/u/alice/outbox".to_string()),
            followers_url: Some("https://bookmarks.example/ap/u/alice/followers".to_string()),
            following_url: Some("https://bookmarks.example/ap/u/alice/following".to_string()),
            public_key_pem: "pem".to_string(),
            private_key_pem: Some("pem".to_string()),
            last_fetched_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_bookmark(id: &str, account_id: &str) -> bookmark::Model {
        bookmark::Model {
            id: id.to_string(),
            account_id: account_id.to_string(),
            url: "https://example.com/article".to_string(),
            title: "A page worth keeping".to_string(),
            description: None,
            tags: serde_json::json!([]),
            main_image: None,
            is_public: true,
            source_uri: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_input() -> CreateBookmarkInput {
        CreateBookmarkInput {
            url: "https://example.com/article".to_string(),
            title: "A page worth keeping".to_string(),
            description: None,
            tags: vec![],
            main_image: None,
            is_public: true,
        }
    }

    #[tokio::test]
    async fn test_create_bookmark() {
        let account = create_test_account("a1");
        let bookmark = create_test_bookmark("b1", "a1");

        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[account]])
                .into_connection(),
        );
        let bookmark_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[bookmark.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = BookmarkService::with_delivery(
            BookmarkRepository::new(bookmark_db),
            AccountRepository::new(account_db),
            Arc::new(NoOpDelivery),
        );

        let result = service.create("a1", test_input()).await.unwrap();

        assert_eq!(result.id, "b1");
        assert!(result.is_public);
    }

    #[tokio::test]
    async fn test_create_bookmark_rejects_empty_url() {
        let account_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let bookmark_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = BookmarkService::new(
            BookmarkRepository::new(bookmark_db),
            AccountRepository::new(account_db),
        );

        let mut input = test_input();
        input.url = "  ".to_string();

        let result = service.create("a1", input).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_create_bookmark_rejects_remote_account() {
        let mut account = create_test_account("a2");
        account.host = Some("remote.example".to_string());
        account.private_key_pem = None;

        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[account]])
                .into_connection(),
        );
        let bookmark_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = BookmarkService::new(
            BookmarkRepository::new(bookmark_db),
            AccountRepository::new(account_db),
        );

        let result = service.create("a2", test_input()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
