//! Account repository.

use std::sync::Arc;

use crate::entities::{account, Account};
use hivecache_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr,
};

/// Account repository for database operations.
#[derive(Clone)]
pub struct AccountRepository {
    db: Arc<DatabaseConnection>,
}

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an account by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<account::Model>> {
        Account::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an account by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<account::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Find accounts by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<account::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Account::find()
            .filter(account::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an account by username and host.
    ///
    /// A `None` host matches local accounts only.
    pub async fn find_by_username_and_host(
        &self,
        username: &str,
        host: Option<&str>,
    ) -> AppResult<Option<account::Model>> {
        let mut query =
            Account::find().filter(account::Column::UsernameLower.eq(username.to_lowercase()));

        query = match host {
            Some(h) => query.filter(account::Column::Host.eq(h)),
            None => query.filter(account::Column::Host.is_null()),
        };

        query
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a local account by username.
    pub async fn find_local_by_username(
        &self,
        username: &str,
    ) -> AppResult<Option<account::Model>> {
        self.find_by_username_and_host(username, None).await
    }

    /// Find an account by `ActivityPub` URI.
    pub async fn find_by_uri(&self, uri: &str) -> AppResult<Option<account::Model>> {
        Account::find()
            .filter(account::Column::Uri.eq(uri))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new account.
    ///
    /// A unique-constraint violation on (`username_lower`, `host`) or on
    /// `uri` maps to [`AppError::Conflict`] so a losing writer can re-query
    /// the row that won the race.
    pub async fn create(&self, model: account::ActiveModel) -> AppResult<account::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if let Some(SqlErr::UniqueConstraintViolation(msg)) = e.sql_err() {
                AppError::Conflict(msg)
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update an account.
    pub async fn update(&self, model: account::ActiveModel) -> AppResult<account::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
