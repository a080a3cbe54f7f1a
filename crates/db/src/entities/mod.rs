//! Database entities.

#![allow(missing_docs)]

pub mod account;
pub mod bookmark;
pub mod follower;
pub mod following;

pub use account::Entity as Account;
pub use bookmark::Entity as Bookmark;
pub use follower::Entity as Follower;
pub use following::Entity as Following;
