//! Inbound Follow processing.

use chrono::Utc;
use hivecache_common::{AppError, AppResult, IdGenerator};
use hivecache_db::entities::{account, follower};
use hivecache_db::repositories::{AccountRepository, FollowerRepository};
use sea_orm::Set;
use tracing::info;

use super::AccountFetcher;
use crate::activities::{AcceptActivity, FollowActivity};
use crate::convert::{UrlConfig, bundle_accept};

/// Result of applying an inbound Follow.
pub struct FollowOutcome {
    /// Local account that gained a follower; its key signs the Accept.
    pub local: account::Model,
    /// Remote follower; its inbox receives the Accept.
    pub remote: account::Model,
    /// Accept echoing the original Follow.
    pub accept: AcceptActivity,
}

/// Applies inbound Follow activities to the follower table.
pub struct FollowProcessor {
    account_repo: AccountRepository,
    follower_repo: FollowerRepository,
    fetcher: AccountFetcher,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl FollowProcessor {
    #[must_use]
    pub const fn new(
        account_repo: AccountRepository,
        follower_repo: FollowerRepository,
        fetcher: AccountFetcher,
        url_config: UrlConfig,
    ) -> Self {
        Self {
            account_repo,
            follower_repo,
            fetcher,
            url_config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record the remote actor as a follower of the local target and bundle
    /// the Accept to send back.
    ///
    /// A repeated Follow for an existing relationship is re-confirmed with a
    /// fresh Accept instead of erroring.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when the target is unknown and
    /// [`AppError::Unprocessable`] when it is not a local account.
    pub async fn process(&self, activity: &FollowActivity) -> AppResult<FollowOutcome> {
        info!(actor = %activity.actor, object = %activity.object, "Processing Follow");

        let local = self
            .account_repo
            .find_by_uri(activity.object.as_str())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No account for follow target {}", activity.object))
            })?;
        if !local.is_local() {
            return Err(AppError::Unprocessable(format!(
                "Follow target {} is not served here",
                activity.object
            )));
        }

        let remote = self.fetcher.find_or_fetch(&activity.actor).await?;

        if self
            .follower_repo
            .find_by_pair(&local.id, &remote.id)
            .await?
            .is_some()
        {
            info!(
                account_id = %local.id,
                follower_account_id = %remote.id,
                "Already a follower, re-confirming"
            );
        } else {
            let model = follower::ActiveModel {
                id: Set(self.id_gen.generate()),
                account_id: Set(local.id.clone()),
                follower_account_id: Set(remote.id.clone()),
                created_at: Set(Utc::now().into()),
            };
            self.follower_repo.create(model).await?;
            info!(
                account_id = %local.id,
                follower_account_id = %remote.id,
                "Follower recorded"
            );
        }

        let accept = bundle_accept(activity, &local, &self.url_config)?;

        Ok(FollowOutcome {
            local,
            remote,
            accept,
        })
    }
}
