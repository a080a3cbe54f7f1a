//! Job workers.

mod deliver;
mod inbox;

pub use deliver::{DeliverContext, deliver_worker};
pub use inbox::{InboxWorkerContext, inbox_worker};

use apalis::prelude::Error;
use hivecache_common::AppError;

/// Hand a transient failure back to the queue backend for retry.
fn retryable(e: AppError) -> Error {
    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
    Error::Failed(boxed.into())
}
