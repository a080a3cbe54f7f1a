//! Inbound activity processors.
//!
//! Each processor applies one activity type against the database. They are
//! invoked from the inbox worker after signature verification.

#![allow(missing_docs)]

mod accept;
mod account_fetcher;
mod create;
mod follow;
mod undo;

pub use accept::AcceptProcessor;
pub use account_fetcher::AccountFetcher;
pub use create::CreateProcessor;
pub use follow::{FollowOutcome, FollowProcessor};
pub use undo::UndoProcessor;
