//! Inbound Accept processing.

use hivecache_common::{AppError, AppResult};
use hivecache_db::repositories::{AccountRepository, FollowingRepository};
use tracing::info;

use crate::activities::AcceptActivity;

/// Confirms pending follows when the remote side accepts them.
pub struct AcceptProcessor {
    account_repo: AccountRepository,
    following_repo: FollowingRepository,
}

impl AcceptProcessor {
    #[must_use]
    pub const fn new(account_repo: AccountRepository, following_repo: FollowingRepository) -> Self {
        Self {
            account_repo,
            following_repo,
        }
    }

    /// Mark the Following row behind the echoed Follow as confirmed.
    ///
    /// Follow ids minted here carry the row id as their URL fragment, which
    /// is tried first; an id minted differently falls back to matching on
    /// the actor pair.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when no pending follow matches.
    pub async fn process(&self, activity: &AcceptActivity) -> AppResult<()> {
        let follow = &activity.object;
        info!(actor = %activity.actor, follow_id = %follow.id, "Processing Accept");

        let local = self
            .account_repo
            .find_by_uri(follow.actor.as_str())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No account for follow actor {}", follow.actor))
            })?;
        if !local.is_local() {
            return Err(AppError::Unprocessable(format!(
                "Accepted Follow was not sent from here: {}",
                follow.actor
            )));
        }

        if let Some(fragment) = follow.id.fragment()
            && let Some(following) = self.following_repo.find_by_id(fragment).await?
            && following.account_id == local.id
        {
            self.following_repo.confirm(&following.id).await?;
            info!(following_id = %following.id, "Follow confirmed");
            return Ok(());
        }

        let target = self
            .account_repo
            .find_by_uri(follow.object.as_str())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Unknown follow target {}", follow.object))
            })?;
        let following = self
            .following_repo
            .find_by_pair(&local.id, &target.id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No follow of {} by {} to confirm",
                    target.uri, local.uri
                ))
            })?;

        self.following_repo.confirm(&following.id).await?;
        info!(following_id = %following.id, "Follow confirmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use activitypub_federation::kinds::activity::{AcceptType, FollowType};
    use chrono::Utc;
    use hivecache_db::entities::{account, following};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use url::Url;

    use crate::activities::FollowActivity;

    fn local_account(id: &str, username: &str) -> account::Model {
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

    fn following_row(id: &str, account_id: &str, target_account_id: &str) -> following::Model {
        following::Model {
            id: id.to_string(),
            account_id: account_id.to_string(),
            target_account_id: target_account_id.to_string(),
            confirmed: false,
            created_at: Utc::now().into(),
        }
    }

    fn accept_activity(follow_id: &str) -> AcceptActivity {
        AcceptActivity {
            context: None,
            kind: AcceptType::Accept,
            id: Url::parse("https://remote.example/activities/10").unwrap(),
            actor: Url::parse("https://remote.example/users/bob").unwrap(),
            object: FollowActivity {
                context: None,
                kind: FollowType::Follow,
                id: Url::parse(follow_id).unwrap(),
                actor: Url::parse("https://bookmarks.example/ap/u/alice").unwrap(),
                object: Url::parse("https://remote.example/users/bob").unwrap(),
            },
        }
    }

    fn processor(
        account_db: Arc<DatabaseConnection>,
        following_db: Arc<DatabaseConnection>,
    ) -> AcceptProcessor {
        AcceptProcessor::new(
            AccountRepository::new(account_db),
            FollowingRepository::new(following_db),
        )
    }

    #[tokio::test]
    async fn test_accept_confirms_via_id_fragment() {
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[local_account("a1", "alice")]])
                .into_connection(),
        );
        let following_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[following_row("f1", "a1", "a2")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        processor(account_db, following_db)
            .process(&accept_activity(
                "https://bookmarks.example/ap/u/alice/outbox#f1",
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_accept_falls_back_to_actor_pair() {
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[local_account("a1", "alice")]])
                .append_query_results([[remote_account("a2", "bob")]])
                .into_connection(),
        );
        let following_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[following_row("f1", "a1", "a2")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        // A follow id without a fragment skips the direct lookup
        processor(account_db, following_db)
            .process(&accept_activity("https://remote.example/activities/9"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_accept_for_unknown_actor_fails() {
        let account_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<account::Model>::new()])
                .into_connection(),
        );
        let following_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = processor(account_db, following_db)
            .process(&accept_activity("https://remote.example/activities/9"))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
