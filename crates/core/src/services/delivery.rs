//! ActivityPub delivery service.
//!
//! Provides an abstraction for queueing ActivityPub activity delivery.
//! The actual implementation is provided by the queue crate.

use async_trait::async_trait;
use hivecache_common::AppResult;
use hivecache_db::entities::{bookmark, following};
use serde_json::Value;
use std::sync::Arc;

/// Trait for ActivityPub delivery.
///
/// This allows the core services to queue ActivityPub activities
/// without directly depending on the queue implementation.
#[async_trait]
pub trait ActivityDelivery: Send + Sync {
    /// Queue a Create activity announcing a public bookmark to followers.
    async fn queue_create_bookmark(&self, bookmark: &bookmark::Model) -> AppResult<()>;

    /// Queue a Follow activity to the followed account's inbox.
    async fn queue_follow(&self, following: &following::Model) -> AppResult<()>;

    /// Queue an Undo of a previously sent Follow.
    ///
    /// Takes the relationship row as it stood before deletion so the
    /// original Follow id can be reconstructed.
    async fn queue_undo_follow(&self, following: &following::Model) -> AppResult<()>;

    /// Queue an already-built activity to a single inbox.
    ///
    /// `signing_account` is the `ActivityPub` URI of the local account
    /// whose key signs the request.
    async fn queue_activity(
        &self,
        signing_account: &str,
        inbox: &str,
        activity: Value,
    ) -> AppResult<()>;
}

/// A no-op implementation of `ActivityDelivery` for testing or when federation is disabled.
#[derive(Clone, Default)]
pub struct NoOpDelivery;

#[async_trait]
impl ActivityDelivery for NoOpDelivery {
    async fn queue_create_bookmark(&self, _bookmark: &bookmark::Model) -> AppResult<()> {
        Ok(())
    }

    async fn queue_follow(&self, _following: &following::Model) -> AppResult<()> {
        Ok(())
    }

    async fn queue_undo_follow(&self, _following: &following::Model) -> AppResult<()> {
        Ok(())
    }

    async fn queue_activity(
        &self,
        _signing_account: &str,
        _inbox: &str,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `ActivityDelivery` trait object.
pub type DeliveryService = Arc<dyn ActivityDelivery>;
