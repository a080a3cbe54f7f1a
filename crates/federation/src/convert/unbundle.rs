//! Remote Note to bookmark extraction.

#![allow(clippy::expect_used)] // compile-time constant regex cannot fail

use chrono::{DateTime, Utc};
use hivecache_common::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::objects::{ApAttachment, ApNote};

static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a\s[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).expect("valid regex")
});

/// Bookmark fields extracted from a remote Note.
#[derive(Debug, Clone)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub main_image: Option<String>,
    pub source_uri: String,
    pub published: DateTime<Utc>,
}

/// Extract bookmark fields from a remote Note.
///
/// The bookmarked URL is the first anchor in the content whose host differs
/// from the note's own host; links back at the originating instance (tag
/// pages, mentions, profile links) are skipped. Hashtag names become tag
/// slugs and the first image attachment becomes the preview image.
///
/// # Errors
///
/// Returns [`AppError::Unprocessable`] when the object is not a Note or no
/// external link can be found. Both are permanent conditions.
pub fn unbundle_note(note: &ApNote) -> AppResult<NewBookmark> {
    if note.kind != "Note" {
        return Err(AppError::Unprocessable(format!(
            "Expected a Note, got {}",
            note.kind
        )));
    }

    let source_host = note
        .id
        .host_str()
        .ok_or_else(|| AppError::Unprocessable(format!("Note id {} has no host", note.id)))?;

    let (url, title) = extract_external_link(&note.content, source_host).ok_or_else(|| {
        AppError::Unprocessable(format!("No external link found in note {}", note.id))
    })?;

    let tags: Vec<String> = note
        .tag
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|t| t.kind == "Hashtag")
        .filter_map(|t| t.name.as_deref())
        .map(slugify)
        .filter(|slug| !slug.is_empty())
        .collect();

    let main_image = note
        .attachment
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|a| is_image(a))
        .map(|a| a.url.to_string());

    Ok(NewBookmark {
        url,
        title,
        tags,
        main_image,
        source_uri: note.id.to_string(),
        published: note.published,
    })
}

/// First anchor whose href leaves the source host, with its text as title.
fn extract_external_link(content: &str, source_host: &str) -> Option<(String, String)> {
    for captures in ANCHOR.captures_iter(content) {
        let href = decode_entities(&captures[1]);

        let Ok(parsed) = Url::parse(&href) else {
            continue;
        };
        let external = parsed
            .host_str()
            .is_some_and(|host| !host.eq_ignore_ascii_case(source_host));
        if !external {
            continue;
        }

        let text = decode_entities(&strip_tags(&captures[2]));
        let text = text.trim();
        let title = if text.is_empty() {
            href.clone()
        } else {
            text.to_string()
        };

        return Some((href, title));
    }

    None
}

fn is_image(attachment: &ApAttachment) -> bool {
    attachment.kind == "Image"
        || attachment
            .media_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"))
}

/// Normalize a hashtag name into a lowercase slug.
fn slugify(name: &str) -> String {
    let trimmed = name.trim().trim_start_matches('#');

    let mut slug = String::new();
    let mut pending_dash = false;
    for c in trimmed.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn strip_tags(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
