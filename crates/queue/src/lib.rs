//! Background job queue for hivecache.
//!
//! This crate provides asynchronous federation processing using Redis:
//!
//! - **Jobs**: outbound activity delivery, inbound activity processing
//! - **Workers**: concurrent job execution with Apalis
//! - **Retry**: exponential backoff with dead-letter logging
//! - **Queueing seams**: Redis-backed implementations of the delivery and
//!   inbox abstractions consumed by the core and federation crates

pub mod delivery_impl;
pub mod jobs;
pub mod retry;
pub mod workers;

pub use delivery_impl::{RedisDeliveryService, RedisInboxQueue};
pub use jobs::*;
pub use retry::{DeadLetterEntry, RetryConfig};
pub use workers::*;
