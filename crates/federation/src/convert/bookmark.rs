//! Bookmark to `ActivityPub` Note conversion.

#![allow(clippy::expect_used)] // URL joins with known-valid paths cannot fail

use activitypub_federation::kinds::activity::CreateType;
use chrono::Utc;
use hivecache_db::entities::{account, bookmark};
use url::Url;

use super::account::UrlConfig;
use crate::activities::{CreateActivity, PUBLIC_ADDRESS, activity_context};
use crate::objects::{ApAttachment, ApNote, ApTag};

/// Extension trait for bundling bookmarks into federated activities.
pub trait BookmarkToActivity {
    /// Render the bookmark as a Note addressed to the given follower set.
    fn to_ap_note(&self, config: &UrlConfig, owner: &account::Model, followers: &[Url]) -> ApNote;

    /// Wrap the bookmark in a Create activity sharing the Note's addressing.
    fn to_create_activity(
        &self,
        config: &UrlConfig,
        owner: &account::Model,
        followers: &[Url],
    ) -> CreateActivity;
}

impl BookmarkToActivity for bookmark::Model {
    fn to_ap_note(&self, config: &UrlConfig, owner: &account::Model, followers: &[Url]) -> ApNote {
        let tags = self.tag_list();

        let to = if self.is_public {
            vec![Url::parse(PUBLIC_ADDRESS).expect("valid URL")]
        } else {
            vec![config.followers_url(&owner.username)]
        };

        let mut cc: Vec<Url> = Vec::new();
        for follower in followers {
            if !cc.contains(follower) {
                cc.push(follower.clone());
            }
        }

        let tag = if tags.is_empty() {
            None
        } else {
            Some(
                tags.iter()
                    .map(|t| ApTag {
                        kind: "Hashtag".to_string(),
                        href: Some(config.tag_url(t)),
                        name: Some(format!("#{t}")),
                    })
                    .collect(),
            )
        };

        let attachment = self.main_image.as_deref().and_then(|image| {
            Url::parse(image).ok().map(|url| {
                vec![ApAttachment {
                    kind: "Image".to_string(),
                    url,
                    media_type: None,
                    name: None,
                }]
            })
        });

        ApNote {
            kind: "Note".to_string(),
            id: config.bookmark_url(&self.id),
            attributed_to: config.user_url(&owner.username),
            content: render_content(self, &tags, config),
            published: self.created_at.with_timezone(&Utc),
            to: Some(to),
            cc: Some(cc),
            summary: None,
            tag,
            attachment,
        }
    }

    fn to_create_activity(
        &self,
        config: &UrlConfig,
        owner: &account::Model,
        followers: &[Url],
    ) -> CreateActivity {
        let note = self.to_ap_note(config, owner, followers);

        CreateActivity {
            context: Some(activity_context()),
            kind: CreateType::Create,
            id: Url::parse(&format!("{}/activity", note.id)).expect("valid URL"),
            actor: config.user_url(&owner.username),
            published: note.published,
            to: note.to.clone(),
            cc: note.cc.clone(),
            object: note,
        }
    }
}

/// Render the Note's HTML body: the bookmarked link, the description, and
/// tag links pointing back at this instance.
fn render_content(bookmark: &bookmark::Model, tags: &[String], config: &UrlConfig) -> String {
    let mut content = format!(
        "<p><a href=\"{}\">{}</a></p>",
        escape_html(&bookmark.url),
        escape_html(&bookmark.title)
    );

    if let Some(ref description) = bookmark.description {
        content.push_str(&format!("<p>{}</p>", escape_html(description)));
    }

    if !tags.is_empty() {
        let links: Vec<String> = tags
            .iter()
            .map(|t| format!("<a href=\"{}\">#{}</a>", config.tag_url(t), escape_html(t)))
            .collect();
        content.push_str(&format!("<p>{}</p>", links.join(" ")));
    }

    content
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
