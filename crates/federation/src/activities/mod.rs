//! `ActivityPub` activity types.

#![allow(missing_docs)]

mod accept;
mod create;
mod follow;
mod undo;

pub use accept::AcceptActivity;
pub use create::CreateActivity;
pub use follow::FollowActivity;
pub use undo::UndoActivity;

use serde_json::{Value, json};

/// The `ActivityStreams` public addressing URI.
pub const PUBLIC_ADDRESS: &str = "https://www.w3.org/ns/activitystreams#Public";

/// JSON-LD context for outgoing activities.
///
/// Carries the `Hashtag` extension because bookmark Notes tag their links.
#[must_use]
pub fn activity_context() -> Value {
    json!([
        "https://www.w3.org/ns/activitystreams",
        {
            "Hashtag": "as:Hashtag"
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_context_includes_activitystreams() {
        let context = activity_context();
        let entries = context.as_array().unwrap();
        assert!(entries.contains(&json!("https://www.w3.org/ns/activitystreams")));
    }
}
