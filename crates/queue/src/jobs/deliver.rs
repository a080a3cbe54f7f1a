//! `ActivityPub` delivery job.

use serde::{Deserialize, Serialize};

/// Job to deliver an activity to a remote inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverJob {
    /// `ActivityPub` URI of the local account whose key signs the request.
    pub actor: String,

    /// Target inbox URL.
    pub inbox: String,

    /// Activity JSON to deliver.
    pub activity: serde_json::Value,
}

impl DeliverJob {
    /// Create a new deliver job.
    #[must_use]
    pub const fn new(actor: String, inbox: String, activity: serde_json::Value) -> Self {
        Self {
            actor,
            inbox,
            activity,
        }
    }
}
