//! Inbound Undo processing.

use hivecache_common::{AppError, AppResult};
use hivecache_db::repositories::{AccountRepository, FollowerRepository};
use tracing::info;

use crate::activities::UndoActivity;

/// Retracts follower relationships when a remote actor undoes its Follow.
pub struct UndoProcessor {
    account_repo: AccountRepository,
    follower_repo: FollowerRepository,
}

impl UndoProcessor {
    #[must_use]
    pub const fn new(account_repo: AccountRepository, follower_repo: FollowerRepository) -> Self {
        Self {
            account_repo,
            follower_repo,
        }
    }

    /// Remove the follower relationship named by the wrapped Follow.
    ///
    /// An Undo from an actor that was never a follower is a no-op; the state
    /// it asks for already holds.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when the follow target is unknown and
    /// [`AppError::Unprocessable`] when it is not a local account.
    pub async fn process(&self, activity: &UndoActivity) -> AppResult<()> {
        let follow = &activity.object;
        info!(actor = %activity.actor, object = %follow.object, "Processing Undo of Follow");

        let local = self
            .account_repo
            .find_by_uri(follow.object.as_str())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No account for follow target {}", follow.object))
            })?;
        if !local.is_local() {
            return Err(AppError::Unprocessable(format!(
                "Follow target {} is not served here",
                follow.object
            )));
        }

        let Some(remote) = self.account_repo.find_by_uri(activity.actor.as_str()).await? else {
            info!(actor = %activity.actor, "Unknown actor, nothing to undo");
            return Ok(());
        };

        self.follower_repo.delete_by_pair(&local.id, &remote.id).await?;
        info!(
            account_id = %local.id,
            follower_account_id = %remote.id,
            "Follower removed"
        );
        Ok(())
    }
}
