//! Follower repository.
//!
//! Rows record remote accounts following a local account. The inverse
//! direction (local accounts following remote ones) lives in
//! [`crate::repositories::FollowingRepository`].

use std::sync::Arc;

use crate::entities::{account, follower, Account, Follower};
use hivecache_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Follower repository for database operations.
#[derive(Clone)]
pub struct FollowerRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowerRepository {
    /// Create a new follower repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follower relationship by the followed account and the follower.
    pub async fn find_by_pair(
        &self,
        account_id: &str,
        follower_account_id: &str,
    ) -> AppResult<Option<follower::Model>> {
        Follower::find()
            .filter(follower::Column::AccountId.eq(account_id))
            .filter(follower::Column::FollowerAccountId.eq(follower_account_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether `follower_account_id` follows `account_id`.
    pub async fn is_follower(
        &self,
        account_id: &str,
        follower_account_id: &str,
    ) -> AppResult<bool> {
        Ok(self
            .find_by_pair(account_id, follower_account_id)
            .await?
            .is_some())
    }

    /// Record a new follower relationship.
    pub async fn create(&self, model: follower::ActiveModel) -> AppResult<follower::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a follower relationship by pair. No-op if absent.
    pub async fn delete_by_pair(
        &self,
        account_id: &str,
        follower_account_id: &str,
    ) -> AppResult<()> {
        let follower = self.find_by_pair(account_id, follower_account_id).await?;
        if let Some(f) = follower {
            f.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Get the accounts following a local account.
    ///
    /// Used for activity fan-out, so this resolves the full account rows
    /// rather than the join rows.
    pub async fn find_follower_accounts(&self, account_id: &str) -> AppResult<Vec<account::Model>> {
        let rows: Vec<(follower::Model, Option<account::Model>)> = Follower::find()
            .filter(follower::Column::AccountId.eq(account_id))
            .find_also_related(Account)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().filter_map(|(_, account)| account).collect())
    }

    /// Get follower relationships for an account (paginated).
    pub async fn find_page(
        &self,
        account_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<follower::Model>> {
        let mut query = Follower::find()
            .filter(follower::Column::AccountId.eq(account_id))
            .order_by_desc(follower::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(follower::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count followers of an account.
    pub async fn count_by_account(&self, account_id: &str) -> AppResult<u64> {
        Follower::find()
            .filter(follower::Column::AccountId.eq(account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_follower(id: &str, account_id: &str, follower_account_id: &str) -> follower::Model {
        follower::Model {
            id: id.to_string(),
            account_id: account_id.to_string(),
            follower_account_id: follower_account_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_pair_found() {
        let follower = create_test_follower("f1", "local1", "remote1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[follower.clone()]])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        let result = repo.find_by_pair("local1", "remote1").await.unwrap();

        assert!(result.is_some());
        let found = result.unwrap();
        assert_eq!(found.account_id, "local1");
        assert_eq!(found.follower_account_id, "remote1");
    }

    #[tokio::test]
    async fn test_find_by_pair_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follower::Model>::new()])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        let result = repo.find_by_pair("local1", "remote2").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_is_follower_true() {
        let follower = create_test_follower("f1", "local1", "remote1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[follower.clone()]])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        assert!(repo.is_follower("local1", "remote1").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_follower_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follower::Model>::new()])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        assert!(!repo.is_follower("local1", "remote2").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_page() {
        let f1 = create_test_follower("f2", "local1", "remote2");
        let f2 = create_test_follower("f1", "local1", "remote1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1, f2]])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        let result = repo.find_page("local1", 100, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "f2");
    }

    #[tokio::test]
    async fn test_find_page_with_cursor() {
        let f1 = create_test_follower("f1", "local1", "remote1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1]])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        let result = repo.find_page("local1", 100, Some("f2")).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "f1");
    }
}
