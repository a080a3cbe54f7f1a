//! Core business logic for hivecache.

pub mod services;

pub use services::*;
