//! Follow relationship to activity conversion.

use activitypub_federation::kinds::activity::{AcceptType, FollowType, UndoType};
use hivecache_common::{AppError, AppResult};
use hivecache_db::entities::{account, following};
use url::Url;

use super::account::UrlConfig;
use crate::activities::{AcceptActivity, FollowActivity, UndoActivity, activity_context};

/// Extension trait for bundling Following rows into activities.
pub trait FollowingToActivity {
    /// Bundle into a Follow addressed to the target account.
    fn to_follow_activity(
        &self,
        config: &UrlConfig,
        owner: &account::Model,
        target: &account::Model,
    ) -> AppResult<FollowActivity>;

    /// Bundle into an Undo wrapping the original Follow.
    fn to_undo_activity(
        &self,
        config: &UrlConfig,
        owner: &account::Model,
        target: &account::Model,
    ) -> AppResult<UndoActivity>;
}

impl FollowingToActivity for following::Model {
    fn to_follow_activity(
        &self,
        config: &UrlConfig,
        owner: &account::Model,
        target: &account::Model,
    ) -> AppResult<FollowActivity> {
        let object = Url::parse(&target.uri).map_err(|e| {
            AppError::Internal(format!("Invalid account URI {}: {e}", target.uri))
        })?;

        Ok(FollowActivity {
            context: Some(activity_context()),
            kind: FollowType::Follow,
            id: follow_activity_id(config, owner, &self.id)?,
            actor: config.user_url(&owner.username),
            object,
        })
    }

    fn to_undo_activity(
        &self,
        config: &UrlConfig,
        owner: &account::Model,
        target: &account::Model,
    ) -> AppResult<UndoActivity> {
        let mut follow = self.to_follow_activity(config, owner, target)?;
        follow.context = None;

        Ok(UndoActivity {
            context: Some(activity_context()),
            kind: UndoType::Undo,
            id: suffixed_id(&follow.id, "/undo")?,
            actor: follow.actor.clone(),
            object: follow,
        })
    }
}

/// Bundle an Accept confirming an inbound Follow, echoing it back verbatim.
pub fn bundle_accept(
    follow: &FollowActivity,
    acceptor: &account::Model,
    config: &UrlConfig,
) -> AppResult<AcceptActivity> {
    let mut inner = follow.clone();
    inner.context = None;

    Ok(AcceptActivity {
        context: Some(activity_context()),
        kind: AcceptType::Accept,
        id: suffixed_id(&follow.id, "/accept")?,
        actor: config.user_url(&acceptor.username),
        object: inner,
    })
}

/// Stable Follow id: the owner's outbox URL with the Following row's id as
/// fragment. Re-bundling the same row yields the same id.
fn follow_activity_id(
    config: &UrlConfig,
    owner: &account::Model,
    following_id: &str,
) -> AppResult<Url> {
    let id = format!("{}#{following_id}", config.outbox_url(&owner.username));
    Url::parse(&id).map_err(|e| AppError::Internal(format!("Invalid activity id {id}: {e}")))
}

fn suffixed_id(id: &Url, suffix: &str) -> AppResult<Url> {
    let suffixed = format!("{id}{suffix}");
    Url::parse(&suffixed)
        .map_err(|e| AppError::Internal(format!("Invalid activity id {suffixed}: {e}")))
}
