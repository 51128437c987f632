//! Ciphertext envelope wire format
//!
//! ```text
//! base64( nonce(16 bytes) ‖ ciphertext ‖ tag(16 bytes) )
//! ```
//!
//! The byte layout is durable: data written before a restart or a key
//! rotation is read back with exactly this framing.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use super::nonce::{Nonce, NONCE_LEN};
use crate::error::{EncryptionError, EncryptionResult};

/// Standard alphabet; output is padded, input is accepted with or without
/// trailing `=`
pub(crate) const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// GCM authentication tag length in bytes (128 bits)
pub const TAG_LEN: usize = 16;

/// Encrypted payload with its nonce prepended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    bytes: Vec<u8>,
}

impl Envelope {
    pub(crate) fn seal(nonce: &Nonce, ciphertext_with_tag: Vec<u8>) -> Self {
        let mut bytes = Vec::with_capacity(NONCE_LEN + ciphertext_with_tag.len());
        bytes.extend_from_slice(nonce.as_bytes());
        bytes.extend_from_slice(&ciphertext_with_tag);
        Self { bytes }
    }

    /// Wrap raw envelope bytes without validating them
    ///
    /// Length checks happen on decryption so that malformed input surfaces as
    /// [`EncryptionError::MalformedCiphertext`] at the point of use.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decode the external base64 representation
    pub fn from_base64(encoded: &str) -> EncryptionResult<Self> {
        BASE64
            .decode(encoded.trim())
            .map(Self::from_bytes)
            .map_err(|e| EncryptionError::malformed(format!("ciphertext is not valid base64: {e}")))
    }

    /// Encode for external representation
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Full envelope bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Split envelope bytes into `(nonce, ciphertext_with_tag)`
pub(crate) fn split(envelope: &[u8]) -> EncryptionResult<(&[u8], &[u8])> {
    if envelope.len() < NONCE_LEN {
        return Err(EncryptionError::malformed(format!(
            "Decoded ciphertext was shorter than the IV size ({NONCE_LEN})"
        )));
    }
    Ok(envelope.split_at(NONCE_LEN))
}
