//! ID generation utilities.

use ulid::Ulid;

/// A cursor value sorting after every generated id.
///
/// Ids are lowercase ULIDs drawn from Crockford base32, whose largest digit is
/// `z`; twenty-six `z`s therefore compares greater than any real id. Collection
/// paging uses this as the reserved "start of collection" cursor so the first
/// page has a stable URI.
pub const MAX_ID: &str = "zzzzzzzzzzzzzzzzzzzzzzzzzz";

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}
