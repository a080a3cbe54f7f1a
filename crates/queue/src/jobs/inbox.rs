//! Inbound delivery processing job.

use hivecache_federation::InboxEnvelope;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Job to process an authenticated inbound delivery.
///
/// Carries the request as it arrived at the inbox endpoint so the worker
/// can decode and dispatch it away from the HTTP edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxJob {
    /// HTTP method of the delivery.
    pub method: String,

    /// Request path the delivery arrived on.
    pub path: String,

    /// Request headers, lower-cased names.
    pub headers: HashMap<String, String>,

    /// Raw request body.
    pub body: String,
}

impl From<InboxEnvelope> for InboxJob {
    fn from(envelope: InboxEnvelope) -> Self {
        Self {
            method: envelope.method,
            path: envelope.path,
            headers: envelope.headers,
            body: envelope.body,
        }
    }
}
