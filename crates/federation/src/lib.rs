//! ActivityPub federation for HiveCache.
//!
//! This crate implements the federated side of the bookmark service:
//!
//! - **Activities**: Follow, Accept, Undo, Create
//! - **Actors**: Person actor documents with public keys
//! - **Objects**: bookmark Notes, WebFinger documents
//! - **Handlers**: actor, WebFinger, collections, inbox endpoints
//! - **Signatures**: draft-cavage HTTP signatures on every exchange
//! - **Processors**: apply verified inbound activities to the database
//!
//! Outbound deliveries and inbound processing both run on the job queue;
//! this crate provides the pieces the queue workers drive.

pub mod activities;
pub mod actors;
pub mod client;
pub mod convert;
pub mod delivery;
pub mod handle;
pub mod handler;
pub mod objects;
pub mod processor;
pub mod signature;

pub use activities::*;
pub use actors::*;
pub use client::{ApClient, ApClientError};
pub use convert::*;
pub use delivery::{collect_shared_inboxes, follower_addresses};
pub use handle::{Handle, parse_handle};
pub use handler::*;
pub use objects::*;
pub use processor::{
    AcceptProcessor, AccountFetcher, CreateProcessor, FollowOutcome, FollowProcessor,
    UndoProcessor,
};
pub use signature::{
    DEFAULT_MAX_CLOCK_SKEW_SECS, HttpSigner, HttpVerifier, SignatureComponents, SignatureError,
    calculate_digest, validate_date, verify_digest,
};
