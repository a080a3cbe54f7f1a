//! Follow service.
//!
//! Drives the outbound side of the follow lifecycle. Inbound Follow,
//! Accept and Undo activities are applied by the federation crate.

use crate::services::delivery::DeliveryService;
use crate::services::resolver::ResolverService;
use hivecache_common::{AppError, AppResult, IdGenerator};
use hivecache_db::{
    entities::{account, follower, following},
    repositories::{AccountRepository, FollowerRepository, FollowingRepository},
};
use sea_orm::Set;

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    following_repo: FollowingRepository,
    follower_repo: FollowerRepository,
    account_repo: AccountRepository,
    delivery: Option<DeliveryService>,
    resolver: Option<ResolverService>,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub fn new(
        following_repo: FollowingRepository,
        follower_repo: FollowerRepository,
        account_repo: AccountRepository,
    ) -> Self {
        Self {
            following_repo,
            follower_repo,
            account_repo,
            delivery: None,
            resolver: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new follow service with `ActivityPub` delivery support.
    #[must_use]
    pub fn with_delivery(
        following_repo: FollowingRepository,
        follower_repo: FollowerRepository,
        account_repo: AccountRepository,
        delivery: DeliveryService,
    ) -> Self {
        Self {
            following_repo,
            follower_repo,
            account_repo,
            delivery: Some(delivery),
            resolver: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the delivery service.
    pub fn set_delivery(&mut self, delivery: DeliveryService) {
        self.delivery = Some(delivery);
    }

    /// Attach a resolver so accounts can be followed by handle.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ResolverService) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the account resolver.
    pub fn set_resolver(&mut self, resolver: ResolverService) {
        self.resolver = Some(resolver);
    }

    /// Follow another account.
    ///
    /// Following a remote account creates an unconfirmed relationship and
    /// queues a Follow activity; the relationship is confirmed once the
    /// remote side sends an Accept. Following a local account completes
    /// immediately.
    pub async fn follow(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> AppResult<following::Model> {
        if account_id == target_account_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if self
            .following_repo
            .is_following(account_id, target_account_id)
            .await?
        {
            return Err(AppError::BadRequest("Already following".to_string()));
        }

        let follower = self.account_repo.get_by_id(account_id).await?;
        if !follower.is_local() {
            return Err(AppError::Forbidden(
                "Only local accounts can follow from here".to_string(),
            ));
        }

        let target = self.account_repo.get_by_id(target_account_id).await?;

        // Local targets need no federation round-trip
        if target.is_local() {
            let follower_model = follower::ActiveModel {
                id: Set(self.id_gen.generate()),
                account_id: Set(target.id.clone()),
                follower_account_id: Set(follower.id.clone()),
                ..Default::default()
            };
            self.follower_repo.create(follower_model).await?;

            let model = following::ActiveModel {
                id: Set(self.id_gen.generate()),
                account_id: Set(follower.id),
                target_account_id: Set(target.id),
                confirmed: Set(true),
                ..Default::default()
            };
            return self.following_repo.create(model).await;
        }

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            account_id: Set(follower.id),
            target_account_id: Set(target.id),
            confirmed: Set(false),
            ..Default::default()
        };

        let following = self.following_repo.create(model).await?;

        // Queue ActivityPub Follow activity
        if let Some(ref delivery) = self.delivery
            && let Err(e) = delivery.queue_follow(&following).await
        {
            tracing::warn!(error = %e, following_id = %following.id, "Failed to queue Follow activity");
        }

        Ok(following)
    }

    /// Stop following another account.
    pub async fn unfollow(&self, account_id: &str, target_account_id: &str) -> AppResult<()> {
        let following = self
            .following_repo
            .find_by_pair(account_id, target_account_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("Not following".to_string()))?;

        let target = self.account_repo.get_by_id(target_account_id).await?;

        self.following_repo
            .delete_by_pair(account_id, target_account_id)
            .await?;

        if target.is_local() {
            self.follower_repo
                .delete_by_pair(target_account_id, account_id)
                .await?;
            return Ok(());
        }

        // Queue ActivityPub Undo of the original Follow
        if let Some(ref delivery) = self.delivery
            && let Err(e) = delivery.queue_undo_follow(&following).await
        {
            tracing::warn!(error = %e, following_id = %following.id, "Failed to queue Undo activity");
        }

        Ok(())
    }

    /// Follow an account given as a `user@host` handle.
    ///
    /// Resolves the handle first, fetching the actor over federation
    /// when it is not yet stored locally.
    pub async fn follow_handle(
        &self,
        account_id: &str,
        handle: &str,
    ) -> AppResult<following::Model> {
        let target = self.resolve(handle).await?;
        self.follow(account_id, &target.id).await
    }

    /// Stop following an account given as a `user@host` handle.
    pub async fn unfollow_handle(&self, account_id: &str, handle: &str) -> AppResult<()> {
        let target = self.resolve(handle).await?;
        self.unfollow(account_id, &target.id).await
    }

    async fn resolve(&self, handle: &str) -> AppResult<account::Model> {
        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| AppError::Internal("Account resolution is not configured".to_string()))?;
        resolver.resolve(handle).await
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

    fn create_test_account(id: &str, username: &str, host: Option<&str>) -> account::Model {
        let host_part = host.unwrap_or("bookmarks.example");
        account::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: host.map(ToString::to_string),
            uri: format!("https://{host_part}/ap/u/{username}"),
            display_name: None,
            summary: None,
            inbox: format!("https://{host_part}/ap/u/{username}/inbox"),
            shared_inbox: Some(format!("https://{host_part}/ap/inbox")),
            outbox: Some(format!("https://{host_part}/ap/u/{username}/outbox")),
            followers_url: Some(format!("https://{host_part}/ap/u/{username}/followers")),
            following_url: Some(format!("https://{host_part}/ap/u/{username}/following")),
            public_key_pem: "pem".to_string(),
            private_key_pem: host.is_none().then(|| "pem".to_string()),
            last_fetched_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_following(id: &str, account_id: &str, target_account_id: &str) -> following::Model {
        following::Model {
            id: id.to_string(),
            account_id: account_id.to_string(),
            target_account_id: target_account_id.to_string(),
            confirmed: false,
            created_at: Utc::now().into(),
        }
    }

    fn empty_db() -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    #[tokio::test]
    async fn test_follow_self_rejected() {
        let service = FollowService::new(
            FollowingRepository::new(empty_db()),
            FollowerRepository::new(empty_db()),
            AccountRepository::new(empty_db()),
        );

        let result = service.follow("a1", "a1").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_follow_already_following_rejected() {
        let existing = create_test_following("f1", "a1", "a2");

        let following_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let service = FollowService::new(
            FollowingRepository::new(following_db),
            FollowerRepository::new(empty_db()),
            AccountRepository::new(empty_db()),
        );

        let result = service.follow("a1", "a2").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_follow_remote_target_unconfirmed() {
        let follower = create_test_account("a1", "alice", None);
        let target = create_test_account("a2", "bob", Some("remote.example"));
        let row = create_test_following("f1", "a1", "a2");

        let following_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[row.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[follower]])
                .append_query_results([[target]])
                .into_connection(),
        );

        let service = FollowService::with_delivery(
            FollowingRepository::new(following_db),
            FollowerRepository::new(empty_db()),
            AccountRepository::new(account_db),
            Arc::new(NoOpDelivery),
        );

        let result = service.follow("a1", "a2").await.unwrap();
        assert!(!result.confirmed);
    }

    struct FixedResolver(account::Model);

    #[async_trait::async_trait]
    impl crate::services::resolver::AccountResolver for FixedResolver {
        async fn resolve(&self, _handle: &str) -> AppResult<account::Model> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_follow_handle_without_resolver_rejected() {
        let service = FollowService::new(
            FollowingRepository::new(empty_db()),
            FollowerRepository::new(empty_db()),
            AccountRepository::new(empty_db()),
        );

        let result = service.follow_handle("a1", "bob@remote.example").await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_follow_handle_resolves_target() {
        let follower = create_test_account("a1", "alice", None);
        let target = create_test_account("a2", "bob", Some("remote.example"));
        let row = create_test_following("f1", "a1", "a2");

        let following_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[row.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[follower]])
                .append_query_results([[target.clone()]])
                .into_connection(),
        );

        let service = FollowService::with_delivery(
            FollowingRepository::new(following_db),
            FollowerRepository::new(empty_db()),
            AccountRepository::new(account_db),
            Arc::new(NoOpDelivery),
        )
        .with_resolver(Arc::new(FixedResolver(target)));

        let result = service.follow_handle("a1", "bob@remote.example").await.unwrap();
        assert_eq!(result.target_account_id, "a2");
        assert!(!result.confirmed);
    }

    #[tokio::test]
    async fn test_unfollow_not_following_rejected() {
        let following_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
        );

        let service = FollowService::new(
            FollowingRepository::new(following_db),
            FollowerRepository::new(empty_db()),
            AccountRepository::new(empty_db()),
        );

        let result = service.unfollow("a1", "a2").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
