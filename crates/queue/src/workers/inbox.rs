//! Inbox worker.
//!
//! Decodes queued inbound deliveries and applies them through the matching
//! processor. Signature verification happened at the HTTP edge, so jobs
//! here are authenticated but otherwise untrusted JSON.

use std::sync::Arc;

use apalis::prelude::*;
use hivecache_common::{AppError, AppResult};
use hivecache_core::DeliveryService;
use hivecache_db::entities::account;
use hivecache_db::repositories::{
    AccountRepository, BookmarkRepository, FollowerRepository, FollowingRepository,
};
use hivecache_federation::{
    AcceptActivity, AcceptProcessor, AccountFetcher, ApClient, CreateActivity, CreateProcessor,
    FollowActivity, FollowProcessor, UndoActivity, UndoProcessor, UrlConfig,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tracing::{error, info, warn};

use super::retryable;
use crate::jobs::InboxJob;
use crate::retry::{DeadLetterEntry, RetryConfig};

/// Context for the inbox worker.
#[derive(Clone)]
pub struct InboxWorkerContext {
    pub db: Arc<DatabaseConnection>,
    pub ap_client: ApClient,
    pub url_config: UrlConfig,
    pub delivery: Option<DeliveryService>,
    pub retry: RetryConfig,
}

impl InboxWorkerContext {
    /// Create a new inbox worker context.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, ap_client: ApClient, url_config: UrlConfig) -> Self {
        Self {
            db,
            ap_client,
            url_config,
            delivery: None,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the delivery service used to answer Follows with Accepts.
    #[must_use]
    pub fn with_delivery(mut self, delivery: DeliveryService) -> Self {
        self.delivery = Some(delivery);
        self
    }

    fn account_repo(&self) -> AccountRepository {
        AccountRepository::new(Arc::clone(&self.db))
    }

    fn bookmark_repo(&self) -> BookmarkRepository {
        BookmarkRepository::new(Arc::clone(&self.db))
    }

    fn follower_repo(&self) -> FollowerRepository {
        FollowerRepository::new(Arc::clone(&self.db))
    }

    fn following_repo(&self) -> FollowingRepository {
        FollowingRepository::new(Arc::clone(&self.db))
    }

    fn fetcher(&self) -> AccountFetcher {
        AccountFetcher::new(
            self.account_repo(),
            self.ap_client.clone(),
            self.url_config.clone(),
        )
    }
}

/// Worker function for processing inbound deliveries.
///
/// Malformed and unsupported payloads are dropped after logging; only
/// infrastructure failures bounce the job back for retry.
///
/// # Errors
/// Returns an error when processing failed in a way worth retrying.
pub async fn inbox_worker(
    job: InboxJob,
    attempt: Attempt,
    ctx: Data<InboxWorkerContext>,
) -> Result<(), Error> {
    match handle_delivery(&job, &ctx).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_transient() => {
            let attempts = u32::try_from(attempt.current()).unwrap_or(u32::MAX);
            if ctx.retry.should_retry(attempts) {
                error!(path = %job.path, attempts, error = %e, "Inbox processing failed, leaving job for retry");
                return Err(retryable(e));
            }

            let entry = DeadLetterEntry::new(job, attempts, e.to_string());
            error!(
                dead_letter = %serde_json::to_string(&entry).unwrap_or_default(),
                "Inbound activity abandoned after retries"
            );
            Ok(())
        }
        Err(e) => {
            warn!(path = %job.path, error = %e, "Dropping unprocessable delivery");
            Ok(())
        }
    }
}

async fn handle_delivery(job: &InboxJob, ctx: &InboxWorkerContext) -> AppResult<()> {
    let activity: Value = match serde_json::from_str(&job.body) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %job.path, error = %e, "Discarding delivery with undecodable body");
            return Ok(());
        }
    };

    match activity.get("type").and_then(Value::as_str) {
        Some("Follow") => process_follow(&activity, ctx).await,
        Some("Accept") => process_accept(&activity, ctx).await,
        Some("Undo") => process_undo(&activity, ctx).await,
        Some("Create") => process_create(&activity, &job.path, ctx).await,
        Some(other) => {
            info!(activity_type = other, "Ignoring unsupported activity");
            Ok(())
        }
        None => {
            warn!("Discarding delivery without an activity type");
            Ok(())
        }
    }
}

async fn process_follow(activity: &Value, ctx: &InboxWorkerContext) -> AppResult<()> {
    let parsed: FollowActivity = match serde_json::from_value(activity.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Discarding malformed Follow");
            return Ok(());
        }
    };

    let processor = FollowProcessor::new(
        ctx.account_repo(),
        ctx.follower_repo(),
        ctx.fetcher(),
        ctx.url_config.clone(),
    );
    let outcome = processor.process(&parsed).await?;

    let Some(ref delivery) = ctx.delivery else {
        warn!(follow_id = %parsed.id, "No delivery configured, Accept not sent");
        return Ok(());
    };
    let accept = serde_json::to_value(&outcome.accept)
        .map_err(|e| AppError::Internal(format!("Failed to serialize Accept: {e}")))?;
    delivery
        .queue_activity(&outcome.local.uri, &outcome.remote.inbox, accept)
        .await?;
    info!(follower = %outcome.remote.uri, "Accept queued");
    Ok(())
}

async fn process_accept(activity: &Value, ctx: &InboxWorkerContext) -> AppResult<()> {
    let parsed: AcceptActivity = match serde_json::from_value(activity.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            info!(error = %e, "Ignoring Accept not wrapping a Follow");
            return Ok(());
        }
    };

    AcceptProcessor::new(ctx.account_repo(), ctx.following_repo())
        .process(&parsed)
        .await
}

async fn process_undo(activity: &Value, ctx: &InboxWorkerContext) -> AppResult<()> {
    let parsed: UndoActivity = match serde_json::from_value(activity.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            info!(error = %e, "Ignoring Undo not wrapping a Follow");
            return Ok(());
        }
    };

    UndoProcessor::new(ctx.account_repo(), ctx.follower_repo())
        .process(&parsed)
        .await
}

async fn process_create(activity: &Value, path: &str, ctx: &InboxWorkerContext) -> AppResult<()> {
    let parsed: CreateActivity = match serde_json::from_value(activity.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            info!(error = %e, "Ignoring Create not wrapping a Note");
            return Ok(());
        }
    };

    let recipient = recipient_for_path(path, ctx).await?;
    CreateProcessor::new(ctx.bookmark_repo(), ctx.following_repo(), ctx.fetcher())
        .process(&parsed, recipient.as_ref())
        .await?;
    Ok(())
}

/// Local account addressed by a per-user inbox path, if any.
///
/// Shared-inbox deliveries have no single recipient; Note handling then
/// falls back to the instance-wide follow check.
async fn recipient_for_path(
    path: &str,
    ctx: &InboxWorkerContext,
) -> AppResult<Option<account::Model>> {
    let Some(username) = inbox_username(path) else {
        return Ok(None);
    };
    let account = ctx.account_repo().find_local_by_username(username).await?;
    if account.is_none() {
        warn!(username, "Inbox path names an unknown account");
    }
    Ok(account)
}

fn inbox_username(path: &str) -> Option<&str> {
    path.strip_prefix("/ap/u/")?
        .strip_suffix("/inbox")
        .filter(|username| !username.is_empty() && !username.contains('/'))
}
