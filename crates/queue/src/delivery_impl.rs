//! Redis-backed queueing seams.
//!
//! Implements the delivery abstraction consumed by the core services and
//! the inbox enqueue abstraction consumed by the federation handlers,
//! both over apalis Redis storage. Local rows are bundled into addressed
//! activities here, at queueing time, so jobs carry finished payloads.

use apalis::prelude::*;
use async_trait::async_trait;
use hivecache_common::{AppError, AppResult};
use hivecache_core::ActivityDelivery;
use hivecache_db::entities::{bookmark, following};
use hivecache_db::repositories::{AccountRepository, FollowerRepository};
use hivecache_federation::{
    BookmarkToActivity, FollowingToActivity, InboxEnqueue, InboxEnvelope, UrlConfig,
    collect_shared_inboxes, follower_addresses,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::jobs::{DeliverJob, InboxJob};

/// Redis-backed `ActivityPub` delivery service.
///
/// Bundles local rows into activities and queues one delivery job per
/// target inbox for the deliver worker.
#[derive(Clone)]
pub struct RedisDeliveryService {
    storage: apalis_redis::RedisStorage<DeliverJob>,
    account_repo: AccountRepository,
    follower_repo: FollowerRepository,
    url_config: UrlConfig,
}

impl RedisDeliveryService {
    /// Create a new Redis delivery service.
    #[must_use]
    pub const fn new(
        storage: apalis_redis::RedisStorage<DeliverJob>,
        account_repo: AccountRepository,
        follower_repo: FollowerRepository,
        url_config: UrlConfig,
    ) -> Self {
        Self {
            storage,
            account_repo,
            follower_repo,
            url_config,
        }
    }

    async fn push(&self, job: DeliverJob) -> AppResult<()> {
        debug!(inbox = %job.inbox, "Queueing delivery job");
        self.storage
            .clone()
            .push(job)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue delivery job: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ActivityDelivery for RedisDeliveryService {
    async fn queue_create_bookmark(&self, bookmark: &bookmark::Model) -> AppResult<()> {
        let owner = self.account_repo.get_by_id(&bookmark.account_id).await?;
        let followers = self.follower_repo.find_follower_accounts(&owner.id).await?;
        if followers.is_empty() {
            debug!(bookmark_id = %bookmark.id, "No followers, nothing to deliver");
            return Ok(());
        }

        let addresses = follower_addresses(&followers);
        let activity = bookmark.to_create_activity(&self.url_config, &owner, &addresses);
        let payload = to_payload(&activity)?;

        let inboxes = collect_shared_inboxes(&followers);
        info!(
            bookmark_id = %bookmark.id,
            inbox_count = inboxes.len(),
            "Queueing Create delivery"
        );
        for inbox in inboxes {
            self.push(DeliverJob::new(owner.uri.clone(), inbox, payload.clone()))
                .await?;
        }
        Ok(())
    }

    async fn queue_follow(&self, following: &following::Model) -> AppResult<()> {
        let owner = self.account_repo.get_by_id(&following.account_id).await?;
        let target = self
            .account_repo
            .get_by_id(&following.target_account_id)
            .await?;
        let activity = following.to_follow_activity(&self.url_config, &owner, &target)?;

        info!(
            following_id = %following.id,
            target_inbox = %target.inbox,
            "Queueing Follow delivery"
        );
        self.push(DeliverJob::new(owner.uri, target.inbox, to_payload(&activity)?))
            .await
    }

    async fn queue_undo_follow(&self, following: &following::Model) -> AppResult<()> {
        let owner = self.account_repo.get_by_id(&following.account_id).await?;
        let target = self
            .account_repo
            .get_by_id(&following.target_account_id)
            .await?;
        let activity = following.to_undo_activity(&self.url_config, &owner, &target)?;

        info!(
            following_id = %following.id,
            target_inbox = %target.inbox,
            "Queueing Undo delivery"
        );
        self.push(DeliverJob::new(owner.uri, target.inbox, to_payload(&activity)?))
            .await
    }

    async fn queue_activity(
        &self,
        signing_account: &str,
        inbox: &str,
        activity: Value,
    ) -> AppResult<()> {
        info!(inbox = %inbox, "Queueing activity delivery");
        self.push(DeliverJob::new(
            signing_account.to_string(),
            inbox.to_string(),
            activity,
        ))
        .await
    }
}

fn to_payload<T: serde::Serialize>(activity: &T) -> AppResult<Value> {
    serde_json::to_value(activity)
        .map_err(|e| AppError::Internal(format!("Failed to serialize activity: {e}")))
}

/// Redis-backed inbound delivery queue.
///
/// Accepts authenticated envelopes from the inbox handlers and stores
/// them for the inbox worker.
#[derive(Clone)]
pub struct RedisInboxQueue {
    storage: apalis_redis::RedisStorage<InboxJob>,
}

impl RedisInboxQueue {
    /// Create a new Redis inbox queue.
    #[must_use]
    pub const fn new(storage: apalis_redis::RedisStorage<InboxJob>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl InboxEnqueue for RedisInboxQueue {
    async fn enqueue(&self, envelope: InboxEnvelope) -> AppResult<()> {
        debug!(path = %envelope.path, "Queueing inbound delivery");
        self.storage
            .clone()
            .push(InboxJob::from(envelope))
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue inbound delivery: {e}")))?;
        Ok(())
    }
}
