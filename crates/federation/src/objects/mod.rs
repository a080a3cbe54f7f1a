//! `ActivityPub` object types.

#![allow(missing_docs)]

mod note;
mod webfinger;

pub use note::{ApAttachment, ApNote, ApTag};
pub use webfinger::{WebfingerDocument, WebfingerLink};
