//! Fediverse handle parsing.

use hivecache_common::{AppError, AppResult};

/// A parsed `username@host` handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub username: String,
    pub host: String,
}

impl Handle {
    /// Whether the handle points at the given local host.
    #[must_use]
    pub fn is_local(&self, local_host: &str) -> bool {
        self.host.eq_ignore_ascii_case(local_host)
    }
}

/// Parse a handle in any of the accepted forms: `user`, `@user`,
/// `user@instance`, `@user@instance`.
///
/// At most one leading `@` is stripped. A handle without an instance part
/// resolves against `local_host`; more than one `@` in the remainder is
/// rejected as ambiguous.
///
/// # Errors
///
/// Returns [`AppError::BadRequest`] for empty or ambiguous handles.
pub fn parse_handle(raw: &str, local_host: &str) -> AppResult<Handle> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('@').unwrap_or(trimmed);

    let parts: Vec<&str> = stripped.split('@').collect();
    let (username, host) = match parts.as_slice() {
        [username] => (*username, local_host),
        [username, host] => (*username, *host),
        _ => return Err(AppError::BadRequest(format!("Ambiguous handle: {raw}"))),
    };

    if username.is_empty() || host.is_empty() {
        return Err(AppError::BadRequest(format!("Malformed handle: {raw}")));
    }

    Ok(Handle {
        username: username.to_string(),
        host: host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_username_defaults_to_local_host() {
        let handle = parse_handle("alice", "bookmarks.example").unwrap();
        assert_eq!(handle.username, "alice");
        assert_eq!(handle.host, "bookmarks.example");
        assert!(handle.is_local("bookmarks.example"));
    }

    #[test]
    fn test_leading_at_is_stripped() {
        let handle = parse_handle("@alice", "bookmarks.example").unwrap();
        assert_eq!(handle.username, "alice");
        assert_eq!(handle.host, "bookmarks.example");
    }

    #[test]
    fn test_full_handle() {
        let handle = parse_handle("alice@remote.example", "bookmarks.example").unwrap();
        assert_eq!(handle.username, "alice");
        assert_eq!(handle.host, "remote.example");
        assert!(!handle.is_local("bookmarks.example"));
    }

    #[test]
    fn test_full_handle_with_leading_at() {
        let handle = parse_handle("@alice@remote.example", "bookmarks.example").unwrap();
        assert_eq!(handle.username, "alice");
        assert_eq!(handle.host, "remote.example");
    }

    #[test]
    fn test_double_at_is_rejected() {
        let result = parse_handle("@alice@remote.example@extra", "bookmarks.example");
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = parse_handle("alice@remote.example@extra", "bookmarks.example");
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_empty_parts_are_rejected() {
        assert!(parse_handle("", "bookmarks.example").is_err());
        assert!(parse_handle("@", "bookmarks.example").is_err());
        assert!(parse_handle("alice@", "bookmarks.example").is_err());
        assert!(parse_handle("@@alice", "bookmarks.example").is_err());
    }

    #[test]
    fn test_host_comparison_is_case_insensitive() {
        let handle = parse_handle("alice@Bookmarks.Example", "bookmarks.example").unwrap();
        assert!(handle.is_local("bookmarks.example"));
    }
}
