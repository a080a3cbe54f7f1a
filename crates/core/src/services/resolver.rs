//! Remote account resolution.
//!
//! Turns a `user@host` handle into a stored account row, discovering and
//! fetching the actor from its home instance when it is not yet known.
//! The implementation lives in the federation crate.

use async_trait::async_trait;
use hivecache_common::AppResult;
use hivecache_db::entities::account;
use std::sync::Arc;

/// Trait for resolving account handles to account rows.
///
/// This allows the core services to follow accounts by handle without
/// directly depending on WebFinger and actor fetching.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Resolve a `user@host` handle, fetching the remote actor if needed.
    async fn resolve(&self, handle: &str) -> AppResult<account::Model>;
}

/// Shared handle to an [`AccountResolver`] implementation.
pub type ResolverService = Arc<dyn AccountResolver>;
