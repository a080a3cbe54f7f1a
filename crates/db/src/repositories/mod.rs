//! Repositories wrapping database access for the federation schema.

#![allow(missing_docs)]

pub mod account;
pub mod bookmark;
pub mod follower;
pub mod following;

pub use account::AccountRepository;
pub use bookmark::BookmarkRepository;
pub use follower::FollowerRepository;
pub use following::FollowingRepository;
