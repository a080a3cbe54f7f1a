//! Bookmark repository.

use std::sync::Arc;

use crate::entities::{bookmark, Bookmark};
use hivecache_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr,
};

/// Bookmark repository for database operations.
#[derive(Clone)]
pub struct BookmarkRepository {
    db: Arc<DatabaseConnection>,
}

impl BookmarkRepository {
    /// Create a new bookmark repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a bookmark by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<bookmark::Model>> {
        Bookmark::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a bookmark by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<bookmark::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bookmark {id}")))
    }

    /// Find a bookmark by the `ActivityPub` id of the Note it came from.
    pub async fn find_by_source_uri(&self, source_uri: &str) -> AppResult<Option<bookmark::Model>> {
        Bookmark::find()
            .filter(bookmark::Column::SourceUri.eq(source_uri))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new bookmark.
    ///
    /// A unique-constraint violation on `source_uri` maps to
    /// [`AppError::Conflict`]; the same remote Note was applied by a
    /// concurrent worker.
    pub async fn create(&self, model: bookmark::ActiveModel) -> AppResult<bookmark::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if let Some(SqlErr::UniqueConstraintViolation(msg)) = e.sql_err() {
                AppError::Conflict(msg)
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a bookmark.
    pub async fn update(&self, model: bookmark::ActiveModel) -> AppResult<bookmark::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the public bookmarks of an account (paginated, newest first).
    pub async fn find_public_by_account(
        &self,
        account_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<bookmark::Model>> {
        let mut query = Bookmark::find()
            .filter(bookmark::Column::AccountId.eq(account_id))
            .filter(bookmark::Column::IsPublic.eq(true))
            .order_by_desc(bookmark::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(bookmark::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count the public bookmarks of an account.
    pub async fn count_public_by_account(&self, account_id: &str) -> AppResult<u64> {
        Bookmark::find()
            .filter(bookmark::Column::AccountId.eq(account_id))
            .filter(bookmark::Column::IsPublic.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
