//! Secure string type with automatic memory zeroization
//!
//! Raw secret-store values (comma-separated base64 key lists) pass through
//! this wrapper so they are zeroed on drop and never rendered by `Debug` or
//! `Display`.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secure string that zeroes memory on drop
///
/// # Security Note
/// `PartialEq` is provided for test convenience; prefer
/// [`SecureString::constant_time_eq`] when comparing secrets.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    /// Create a new secure string
    pub fn new(s: String) -> Self {
        Self { inner: s }
    }

    /// Expose the inner value (use with caution)
    ///
    /// # Security Warning
    /// The exposed value should not be stored or logged.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Compare with another secure string in constant time
    pub fn constant_time_eq(&self, other: &SecureString) -> bool {
        constant_time_eq(self.expose().as_bytes(), other.expose().as_bytes())
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        self.constant_time_eq(other)
    }
}

impl Eq for SecureString {}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Constant-time comparison to prevent timing attacks
///
/// Only the length check short-circuits; lengths of key material are not
/// secret.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    //! Unit tests for security::secure_string.
    use super::*;

    /// Validates `SecureString::new` behavior for the secure string creation
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `s.len()` equals `4`.
    /// - Confirms `s.expose()` equals `"test"`.
    #[test]
    fn test_secure_string_creation() {
        let s = SecureString::new("test".to_string());
        assert_eq!(s.len(), 4);
        assert_eq!(s.expose(), "test");
    }

    /// Validates redaction of `Debug` and `Display`.
    ///
    /// Assertions:
    /// - Confirms debug output equals `"SecureString(***)"`.
    /// - Confirms display output equals `"***"`.
    /// - Ensures neither contains the secret.
    #[test]
    fn test_secure_string_is_redacted() {
        let s = SecureString::from("7h6sh6t6tchCmNnHjK2kFA==");
        let debug_str = format!("{:?}", s);
        let display_str = format!("{}", s);

        assert_eq!(debug_str, "SecureString(***)");
        assert_eq!(display_str, "***");
        assert!(!debug_str.contains("7h6sh6"));
        assert!(!display_str.contains("7h6sh6"));
    }

    /// Validates `SecureString::constant_time_eq` for equal, different and
    /// different-length values.
    #[test]
    fn test_constant_time_eq() {
        let s1 = SecureString::from("test");
        let s2 = SecureString::from("test");
        let s3 = SecureString::from("tesT");
        let s4 = SecureString::from("much longer string");

        assert!(s1.constant_time_eq(&s2));
        assert!(!s1.constant_time_eq(&s3));
        assert!(!s1.constant_time_eq(&s4));
        assert_eq!(s1, s2);
    }
}
