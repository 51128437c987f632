//! AES key material and ordered key sets
//!
//! A [`KeySet`] is parsed eagerly at the provider boundary: once a value of
//! this type exists every element is a valid 16/24/32-byte key and the set is
//! non-empty, so nothing downstream handles raw strings.

use std::fmt;
use std::slice;
use std::sync::Arc;

use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::secure_string::{constant_time_eq, SecureString};
use crate::crypto::envelope::BASE64;
use crate::error::{CommonError, EncryptionError, EncryptionResult};

/// Separator between keys in a stored key-set value
pub const KEY_SET_DELIMITER: char = ',';

/// Supported AES key lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySize {
    Aes128,
    Aes192,
    Aes256,
}

impl KeySize {
    /// Key length in bytes
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Map a byte length to a key size
    pub fn from_byte_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Aes128),
            24 => Some(Self::Aes192),
            32 => Some(Self::Aes256),
            _ => None,
        }
    }
}

impl fmt::Display for KeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AES-{}", self.byte_len() * 8)
    }
}

/// A single AES key
///
/// Bytes are zeroed on drop and never printed.
#[derive(Clone)]
pub struct AesKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl AesKey {
    /// Wrap raw key bytes
    ///
    /// # Errors
    /// [`EncryptionError::InvalidKeySize`] unless `bytes` is 16, 24 or 32
    /// bytes long.
    pub fn from_bytes(bytes: Vec<u8>) -> EncryptionResult<Self> {
        let bytes = Zeroizing::new(bytes);
        if KeySize::from_byte_len(bytes.len()).is_none() {
            return Err(EncryptionError::InvalidKeySize { actual: bytes.len() });
        }
        Ok(Self { bytes })
    }

    /// Decode a single base64-encoded key
    ///
    /// # Errors
    /// - [`CommonError::Validation`] if `encoded` is not valid base64
    /// - [`EncryptionError::InvalidKeySize`] if the decoded length is wrong
    pub fn from_base64(encoded: &str) -> EncryptionResult<Self> {
        let decoded = BASE64.decode(encoded.trim()).map_err(|_| {
            CommonError::validation("key", "key material is not valid base64")
        })?;
        Self::from_bytes(decoded)
    }

    /// Generate a random key from the operating system RNG
    pub fn generate(size: KeySize) -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; size.byte_len()]);
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Base64 form suitable for storing in a secret store
    pub fn to_base64(&self) -> SecureString {
        SecureString::new(BASE64.encode(self.bytes.as_slice()))
    }

    pub fn size(&self) -> KeySize {
        match self.bytes.len() {
            16 => KeySize::Aes128,
            24 => KeySize::Aes192,
            _ => KeySize::Aes256,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for AesKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.bytes, &other.bytes)
    }
}

impl Eq for AesKey {}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AesKey({})", self.size())
    }
}

/// Ordered, non-empty set of keys, newest first
///
/// Element 0 is the current encryption key; every element is a decryption
/// candidate. Clones share the same allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct KeySet {
    keys: Arc<[AesKey]>,
}

impl KeySet {
    /// Parse a stored key-set value
    ///
    /// Splits on `,`, trims whitespace, drops empty segments and decodes each
    /// remaining segment as a base64 key.
    ///
    /// # Errors
    /// - [`CommonError::Validation`] if no segment remains or a segment is not
    ///   valid base64
    /// - [`EncryptionError::InvalidKeySize`] if a decoded key has the wrong
    ///   length
    pub fn parse(raw: &str) -> EncryptionResult<Self> {
        let keys = raw
            .split(KEY_SET_DELIMITER)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(AesKey::from_base64)
            .collect::<EncryptionResult<Vec<_>>>()?;

        Self::from_keys(keys)
    }

    /// Build a key set from already decoded keys, newest first
    pub fn from_keys(keys: Vec<AesKey>) -> EncryptionResult<Self> {
        if keys.is_empty() {
            return Err(CommonError::validation("keys", "key set contains no keys").into());
        }
        Ok(Self { keys: keys.into() })
    }

    /// The current encryption key
    pub fn current(&self) -> &AesKey {
        // Non-empty by construction.
        &self.keys[0]
    }

    pub fn iter(&self) -> slice::Iter<'_, AesKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a AesKey;
    type IntoIter = slice::Iter<'a, AesKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet").field("len", &self.keys.len()).finish()
    }
}

/// Generate a store-ready key-set value of `count` fresh keys
///
/// # Example
/// ```
/// use edc_data_encryption::security::{generate_key_set_value, KeySet, KeySize};
///
/// let value = generate_key_set_value(3, KeySize::Aes128);
/// let keys = KeySet::parse(value.expose()).unwrap();
/// assert_eq!(keys.len(), 3);
/// ```
pub fn generate_key_set_value(count: usize, size: KeySize) -> SecureString {
    let mut value = String::new();
    for index in 0..count {
        if index > 0 {
            value.push(KEY_SET_DELIMITER);
        }
        value.push_str(AesKey::generate(size).to_base64().expose());
    }
    SecureString::new(value)
}
