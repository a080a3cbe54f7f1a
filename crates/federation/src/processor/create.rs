//! Inbound Create processing.

use hivecache_common::{AppError, AppResult, IdGenerator};
use hivecache_db::entities::{account, bookmark};
use hivecache_db::repositories::{BookmarkRepository, FollowingRepository};
use sea_orm::Set;
use serde_json::json;
use tracing::{debug, info};

use super::AccountFetcher;
use crate::activities::CreateActivity;
use crate::convert::unbundle_note;

/// Applies inbound Create activities, turning remote Notes into bookmarks.
pub struct CreateProcessor {
    bookmark_repo: BookmarkRepository,
    following_repo: FollowingRepository,
    fetcher: AccountFetcher,
    id_gen: IdGenerator,
}

impl CreateProcessor {
    #[must_use]
    pub const fn new(
        bookmark_repo: BookmarkRepository,
        following_repo: FollowingRepository,
        fetcher: AccountFetcher,
    ) -> Self {
        Self {
            bookmark_repo,
            following_repo,
            fetcher,
            id_gen: IdGenerator::new(),
        }
    }

    /// Apply a Create carrying a bookmark Note.
    ///
    /// `recipient` is the addressed local owner for deliveries to a user
    /// inbox; shared-inbox deliveries pass `None` and the Note is kept when
    /// any local account follows the sender. Notes from unfollowed senders
    /// and Notes already applied return without changes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unprocessable`] when the Note cannot be turned
    /// into a bookmark; this is permanent and the activity is dropped.
    pub async fn process(
        &self,
        activity: &CreateActivity,
        recipient: Option<&account::Model>,
    ) -> AppResult<Option<bookmark::Model>> {
        let note = &activity.object;
        info!(actor = %activity.actor, note_id = %note.id, "Processing Create");

        if let Some(existing) = self
            .bookmark_repo
            .find_by_source_uri(note.id.as_str())
            .await?
        {
            info!(bookmark_id = %existing.id, "Note already applied");
            return Ok(Some(existing));
        }

        let sender = self.fetcher.find_or_fetch(&activity.actor).await?;

        let followed = match recipient {
            Some(owner) => {
                self.following_repo
                    .is_following(&owner.id, &sender.id)
                    .await?
            }
            None => {
                self.following_repo
                    .any_following_target(&sender.id)
                    .await?
            }
        };
        if !followed {
            info!(actor = %activity.actor, "Sender is not followed locally, dropping Note");
            return Ok(None);
        }

        let new = unbundle_note(note)?;

        let model = bookmark::ActiveModel {
            id: Set(self.id_gen.generate()),
            account_id: Set(sender.id.clone()),
            url: Set(new.url),
            title: Set(new.title),
            description: Set(None),
            tags: Set(json!(new.tags)),
            main_image: Set(new.main_image),
            is_public: Set(note.is_public()),
            source_uri: Set(Some(new.source_uri.clone())),
            created_at: Set(new.published.into()),
            updated_at: Set(None),
        };

        match self.bookmark_repo.create(model).await {
            Ok(created) => {
                info!(
                    bookmark_id = %created.id,
                    account_id = %sender.id,
                    "Bookmark created from remote note"
                );
                Ok(Some(created))
            }
            Err(AppError::Conflict(_)) => {
                debug!(
                    source_uri = %new.source_uri,
                    "Note applied by a concurrent worker, re-reading"
                );
                Ok(self.bookmark_repo.find_by_source_uri(&new.source_uri).await?)
            }
            Err(e) => Err(e),
        }
    }
}
