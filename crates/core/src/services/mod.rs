//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod bookmark;
pub mod delivery;
pub mod follow;
pub mod resolver;

pub use account::{AccountService, CreateLocalAccountInput};
pub use bookmark::{BookmarkService, CreateBookmarkInput};
pub use delivery::{ActivityDelivery, DeliveryService, NoOpDelivery};
pub use follow::FollowService;
pub use resolver::{AccountResolver, ResolverService};
