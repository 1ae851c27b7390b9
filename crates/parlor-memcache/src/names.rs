//! Name validation for collections, documents and entry keys.
//!
//! Every name becomes exactly one path component on disk. Valid names:
//! - Must be non-empty and at most 255 bytes
//! - Must not contain `/`, `\` or NUL
//! - Must not start with `.` (this also rules out `.` and `..`, and keeps
//!   dot-names free for the layout marker)

use crate::error::{MemcacheError, Result};

/// Longest name most filesystems accept for a single component.
pub const MAX_NAME_LEN: usize = 255;

const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

/// Validate a name for use as a single path component.
///
/// # Examples
///
/// ```
/// use parlor_memcache::names::validate_name;
///
/// assert!(validate_name("room-1").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("..").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<()> {
    let reject = |reason: String| {
        Err(MemcacheError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("must not be empty".into());
    }
    if name.len() > MAX_NAME_LEN {
        return reject(format!("longer than {MAX_NAME_LEN} bytes"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return reject(format!("contains forbidden character: {ch:?}"));
    }
    if name.starts_with('.') {
        return reject("must not start with '.'".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        for name in ["users", "room-1", "alice@example.com", "m_1700000000", "ünïcode"] {
            assert!(validate_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_bad_names() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        for name in ["", ".", "..", ".hidden", "a/b", "a\\b", "nul\0byte", long.as_str()] {
            let err = validate_name(name).unwrap_err();
            assert!(matches!(err, MemcacheError::InvalidName { .. }), "{name:?}");
        }
    }

    #[test]
    fn max_length_is_allowed() {
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }
}
