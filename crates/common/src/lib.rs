//! Common utilities and shared types for HiveCache.
//!
//! This crate provides foundational components used across all HiveCache crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`],
//!   with a [`FailureKind`] classification consumed by the queue workers
//! - **Cryptography**: RSA key generation for `ActivityPub` signatures
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]

pub mod config;
pub mod crypto;
pub mod error;
pub mod id;

pub use config::Config;
pub use crypto::{RsaKeypair, generate_rsa_keypair, parse_private_key, parse_public_key};
pub use error::{AppError, AppResult, FailureKind};
pub use id::{IdGenerator, MAX_ID};
