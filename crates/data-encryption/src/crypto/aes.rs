//! AES-GCM authenticated encryption
//!
//! Stateless apart from the [`NonceGenerator`] it owns. Supports AES-128,
//! AES-192 and AES-256 keys, always with a 16-byte nonce and a 128-bit tag:
//!
//! ```text
//! encrypt(plaintext, key) = nonce(16) ‖ AES-GCM(key, nonce, plaintext) ‖ tag(16)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use edc_data_encryption::crypto::AesGcmAlgorithm;
//! use edc_data_encryption::security::{AesKey, KeySize};
//!
//! let algorithm = AesGcmAlgorithm::new();
//! let key = AesKey::generate(KeySize::Aes256);
//!
//! let envelope = algorithm.encrypt(b"sensitive data", &key)?;
//! let decrypted = algorithm.decrypt(envelope.as_bytes(), &key)?;
//! assert_eq!(decrypted, b"sensitive data");
//! # Ok::<(), edc_data_encryption::error::EncryptionError>(())
//! ```

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::aes::{Aes128, Aes192, Aes256};
use aes_gcm::AesGcm;

use super::envelope::{self, Envelope};
use super::nonce::NonceGenerator;
use crate::error::{CommonError, EncryptionError, EncryptionResult};
use crate::security::AesKey;

type Aes128Gcm16 = AesGcm<Aes128, U16>;
type Aes192Gcm16 = AesGcm<Aes192, U16>;
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Outcome of trying a single candidate key
///
/// Lets callers fold over candidate keys without inspecting error variants:
/// `WrongKey` means "try the next key", `Abort` means "stop now".
#[derive(Debug)]
pub enum DecryptAttempt {
    Plaintext(Vec<u8>),
    WrongKey,
    Abort(EncryptionError),
}

impl From<EncryptionResult<Vec<u8>>> for DecryptAttempt {
    fn from(result: EncryptionResult<Vec<u8>>) -> Self {
        match result {
            Ok(plaintext) => Self::Plaintext(plaintext),
            Err(EncryptionError::AuthenticationFailure) => Self::WrongKey,
            Err(other) => Self::Abort(other),
        }
    }
}

/// AES-GCM encrypt/decrypt primitive
#[derive(Debug, Default)]
pub struct AesGcmAlgorithm {
    nonces: NonceGenerator,
}

impl AesGcmAlgorithm {
    /// Create an algorithm instance with its own nonce generator
    pub fn new() -> Self {
        Self { nonces: NonceGenerator::new() }
    }

    /// Encrypt `plaintext` under `key` and frame the result as an envelope
    ///
    /// # Errors
    /// - [`EncryptionError::InvalidKeySize`] if the key is not 16/24/32 bytes
    pub fn encrypt(&self, plaintext: &[u8], key: &AesKey) -> EncryptionResult<Envelope> {
        let nonce = self.nonces.next_nonce();
        let nonce_bytes = nonce.as_bytes();
        let key_bytes = key.expose();

        let ciphertext = match key_bytes.len() {
            16 => seal::<Aes128Gcm16>(key_bytes, nonce_bytes, plaintext),
            24 => seal::<Aes192Gcm16>(key_bytes, nonce_bytes, plaintext),
            32 => seal::<Aes256Gcm16>(key_bytes, nonce_bytes, plaintext),
            actual => Err(EncryptionError::InvalidKeySize { actual }),
        }?;

        Ok(Envelope::seal(&nonce, ciphertext))
    }

    /// Decrypt envelope bytes under `key`
    ///
    /// # Errors
    /// - [`EncryptionError::MalformedCiphertext`] if shorter than the nonce
    /// - [`EncryptionError::InvalidKeySize`] if the key is not 16/24/32 bytes
    /// - [`EncryptionError::AuthenticationFailure`] if the tag does not
    ///   validate (wrong key or tampered data)
    pub fn decrypt(&self, envelope: &[u8], key: &AesKey) -> EncryptionResult<Vec<u8>> {
        let (nonce, ciphertext) = envelope::split(envelope)?;
        let key_bytes = key.expose();

        match key_bytes.len() {
            16 => open::<Aes128Gcm16>(key_bytes, nonce, ciphertext),
            24 => open::<Aes192Gcm16>(key_bytes, nonce, ciphertext),
            32 => open::<Aes256Gcm16>(key_bytes, nonce, ciphertext),
            actual => Err(EncryptionError::InvalidKeySize { actual }),
        }
    }

    /// Decrypt with one candidate key and classify the outcome
    pub fn attempt_decrypt(&self, envelope: &[u8], key: &AesKey) -> DecryptAttempt {
        self.decrypt(envelope, key).into()
    }
}

fn seal<C>(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> EncryptionResult<Vec<u8>>
where
    C: KeyInit + AeadCore<NonceSize = U16> + Aead,
{
    let cipher =
        C::new_from_slice(key).map_err(|_| EncryptionError::InvalidKeySize { actual: key.len() })?;
    cipher
        .encrypt(GenericArray::from_slice(nonce), plaintext)
        .map_err(|_| CommonError::internal("crypto::aes", "AES-GCM encryption failed").into())
}

fn open<C>(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> EncryptionResult<Vec<u8>>
where
    C: KeyInit + AeadCore<NonceSize = U16> + Aead,
{
    let cipher =
        C::new_from_slice(key).map_err(|_| EncryptionError::InvalidKeySize { actual: key.len() })?;
    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| EncryptionError::AuthenticationFailure)
}
