//! Conversion between database entities and `ActivityPub` types.

#![allow(missing_docs)]

mod account;
mod bookmark;
mod follow;
mod unbundle;

pub use account::{AccountToApPerson, UrlConfig};
pub use bookmark::BookmarkToActivity;
pub use follow::{FollowingToActivity, bundle_accept};
pub use unbundle::{NewBookmark, unbundle_note};
