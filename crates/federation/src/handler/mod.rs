//! `ActivityPub` request handlers.

#![allow(missing_docs)]

mod collections;
mod inbox;
mod user;
mod webfinger;

pub use collections::{
    Collection, CollectionPage, CollectionQuery, CollectionState, OrderedCollection,
    OrderedCollectionPage, PAGE_SIZE, followers_handler, following_handler, outbox_handler,
};
pub use inbox::{
    InboxEnqueue, InboxEnvelope, InboxState, shared_inbox_collection_handler,
    shared_inbox_handler, user_inbox_collection_handler, user_inbox_handler,
};
pub use user::{ActorState, actor_handler};
pub use webfinger::{WebfingerQuery, WebfingerState, webfinger_handler};
