//! Following repository.
//!
//! Rows record local accounts following remote accounts. The row starts
//! unconfirmed and is flipped once the remote side sends an Accept.

use std::sync::Arc;

use crate::entities::{following, Following};
use hivecache_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

/// Following repository for database operations.
#[derive(Clone)]
pub struct FollowingRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowingRepository {
    /// Create a new following repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a following relationship by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<following::Model>> {
        Following::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a following relationship by follower and followee.
    pub async fn find_by_pair(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> AppResult<Option<following::Model>> {
        Following::find()
            .filter(following::Column::AccountId.eq(account_id))
            .filter(following::Column::TargetAccountId.eq(target_account_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if `account_id` is following `target_account_id`.
    pub async fn is_following(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> AppResult<bool> {
        Ok(self
            .find_by_pair(account_id, target_account_id)
            .await?
            .is_some())
    }

    /// Check whether any local account follows the given target.
    pub async fn any_following_target(&self, target_account_id: &str) -> AppResult<bool> {
        let count = Following::find()
            .filter(following::Column::TargetAccountId.eq(target_account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Create a new following relationship.
    pub async fn create(&self, model: following::ActiveModel) -> AppResult<following::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a following relationship as confirmed by the remote side.
    pub async fn confirm(&self, id: &str) -> AppResult<()> {
        Following::update_many()
            .col_expr(following::Column::Confirmed, Expr::value(true))
            .filter(following::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a following relationship by pair. No-op if absent.
    pub async fn delete_by_pair(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> AppResult<()> {
        let following = self.find_by_pair(account_id, target_account_id).await?;
        if let Some(f) = following {
            f.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Get following relationships for an account (paginated).
    pub async fn find_page(
        &self,
        account_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        let mut query = Following::find()
            .filter(following::Column::AccountId.eq(account_id))
            .order_by_desc(following::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(following::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count accounts an account is following.
    pub async fn count_by_account(&self, account_id: &str) -> AppResult<u64> {
        Following::find()
            .filter(following::Column::AccountId.eq(account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
