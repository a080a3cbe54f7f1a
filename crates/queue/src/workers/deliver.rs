//! Deliver worker.
//!
//! Ships each queued activity to its inbox with a signed POST. Failures
//! are classified before retrying: a remote that answered with a rejection
//! is not asked again, an unreachable one is, up to the retry bound.

use apalis::prelude::*;
use hivecache_common::{AppError, AppResult};
use hivecache_db::repositories::AccountRepository;
use hivecache_federation::{ApClient, HttpSigner, UrlConfig};
use tracing::{error, info, warn};

use super::retryable;
use crate::jobs::DeliverJob;
use crate::retry::{DeadLetterEntry, RetryConfig};

/// Context for the deliver worker.
#[derive(Clone)]
pub struct DeliverContext {
    pub account_repo: AccountRepository,
    pub ap_client: ApClient,
    pub url_config: UrlConfig,
    pub retry: RetryConfig,
}

impl DeliverContext {
    /// Create a new deliver context.
    #[must_use]
    pub fn new(account_repo: AccountRepository, ap_client: ApClient, url_config: UrlConfig) -> Self {
        Self {
            account_repo,
            ap_client,
            url_config,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Worker function for delivering activities.
///
/// # Errors
/// Returns an error when delivery failed in a way worth retrying.
pub async fn deliver_worker(
    job: DeliverJob,
    attempt: Attempt,
    ctx: Data<DeliverContext>,
) -> Result<(), Error> {
    info!(actor = %job.actor, inbox = %job.inbox, "Delivering activity");

    match deliver(&job, &ctx).await {
        Ok(()) => {
            info!(inbox = %job.inbox, "Activity delivered");
            Ok(())
        }
        Err(e) if e.is_transient() => {
            let attempts = u32::try_from(attempt.current()).unwrap_or(u32::MAX);
            if ctx.retry.should_retry(attempts) {
                error!(inbox = %job.inbox, attempts, error = %e, "Delivery failed, leaving job for retry");
                return Err(retryable(e));
            }

            let entry = DeadLetterEntry::new(job, attempts, e.to_string());
            error!(
                dead_letter = %serde_json::to_string(&entry).unwrap_or_default(),
                "Delivery abandoned after retries"
            );
            Ok(())
        }
        Err(e) => {
            warn!(inbox = %job.inbox, error = %e, "Dropping undeliverable job");
            Ok(())
        }
    }
}

async fn deliver(job: &DeliverJob, ctx: &DeliverContext) -> AppResult<()> {
    let account = ctx
        .account_repo
        .find_by_uri(&job.actor)
        .await?
        .ok_or_else(|| AppError::AccountNotFound(job.actor.clone()))?;
    let private_key = account.private_key_pem.as_deref().ok_or_else(|| {
        AppError::Unprocessable(format!("Account {} has no signing key", account.uri))
    })?;

    let signer = HttpSigner::new(private_key, ctx.url_config.public_key_url(&account.username))
        .map_err(|e| {
            AppError::Unprocessable(format!("Unusable signing key for {}: {e}", account.uri))
        })?;

    match ctx
        .ap_client
        .deliver(&job.inbox, &job.activity, &signer)
        .await
    {
        Ok(()) => Ok(()),
        Err(e) => match e.status() {
            // The remote processed the request and turned it down.
            Some(status) if (400..500).contains(&status) => Err(AppError::Unprocessable(
                format!("Inbox {} rejected delivery: {e}", job.inbox),
            )),
            _ => Err(AppError::Federation(format!(
                "Delivery to {} failed: {e}",
                job.inbox
            ))),
        },
    }
}
