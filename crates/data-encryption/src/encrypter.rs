//! String-in/string-out encryption facade
//!
//! [`DataEncrypter`] is the contract consumers depend on.
//! [`AesDataEncrypter`] combines [`AesGcmAlgorithm`] with a [`KeyProvider`]:
//!
//! - `encrypt` always uses the provider's current key.
//! - `decrypt` tries every key of the decryption set in order. A key that
//!   fails authentication is skipped; any other failure stops the search and
//!   is returned as-is. When no key authenticates the envelope the caller gets
//!   [`EncryptionError::DecryptionFailed`], which never says which keys were
//!   tried.
//!
//! [`NoneDataEncrypter`] passes values through unchanged for deployments with
//! encryption disabled.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use edc_data_encryption::encrypter::{AesDataEncrypter, DataEncrypter};
//! use edc_data_encryption::security::{InMemorySecretStore, VaultKeyProvider};
//!
//! let store = InMemorySecretStore::new();
//! store.put("my-alias", "7h6sh6t6tchCmNnHjK2kFA==");
//!
//! let encrypter = AesDataEncrypter::new(VaultKeyProvider::new(Arc::new(store), "my-alias"));
//! let ciphertext = encrypter.encrypt("hello world!")?;
//! assert_eq!(encrypter.decrypt(&ciphertext)?, "hello world!");
//! # Ok::<(), edc_data_encryption::error::EncryptionError>(())
//! ```

use tracing::{instrument, warn};

use crate::crypto::{AesGcmAlgorithm, DecryptAttempt, Envelope};
use crate::error::{EncryptionError, EncryptionResult, ErrorClassification};
use crate::security::KeyProvider;

/// Symmetric encryption of string payloads
pub trait DataEncrypter: Send + Sync {
    /// Encrypt `raw` and return the base64 envelope
    fn encrypt(&self, raw: &str) -> EncryptionResult<String>;

    /// Decrypt a base64 envelope produced by [`DataEncrypter::encrypt`]
    fn decrypt(&self, encrypted: &str) -> EncryptionResult<String>;
}

/// AES-GCM encrypter with key rotation support
pub struct AesDataEncrypter<P> {
    algorithm: AesGcmAlgorithm,
    key_provider: P,
}

impl<P: KeyProvider> AesDataEncrypter<P> {
    pub fn new(key_provider: P) -> Self {
        Self { algorithm: AesGcmAlgorithm::new(), key_provider }
    }
}

impl<P: KeyProvider> DataEncrypter for AesDataEncrypter<P> {
    #[instrument(skip_all)]
    fn encrypt(&self, raw: &str) -> EncryptionResult<String> {
        let key = self.key_provider.current_encryption_key()?;
        let envelope = self.algorithm.encrypt(raw.as_bytes(), &key)?;
        Ok(envelope.to_base64())
    }

    #[instrument(skip_all)]
    fn decrypt(&self, encrypted: &str) -> EncryptionResult<String> {
        let envelope = Envelope::from_base64(encrypted)?;
        let keys = self.key_provider.decryption_keys()?;

        for key in &keys {
            match self.algorithm.attempt_decrypt(envelope.as_bytes(), key) {
                DecryptAttempt::Plaintext(plaintext) => {
                    return String::from_utf8(plaintext).map_err(|_| {
                        EncryptionError::malformed("decrypted payload is not valid UTF-8")
                    });
                }
                DecryptAttempt::WrongKey => continue,
                DecryptAttempt::Abort(err) => return Err(err),
            }
        }

        let err = EncryptionError::DecryptionFailed;
        warn!(
            candidate_keys = keys.len(),
            severity = %err.severity(),
            "No decryption key authenticated the ciphertext"
        );
        Err(err)
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for AesDataEncrypter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesDataEncrypter").field("key_provider", &self.key_provider).finish()
    }
}

/// Pass-through encrypter used when encryption is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneDataEncrypter;

impl DataEncrypter for NoneDataEncrypter {
    fn encrypt(&self, raw: &str) -> EncryptionResult<String> {
        Ok(raw.to_string())
    }

    fn decrypt(&self, encrypted: &str) -> EncryptionResult<String> {
        Ok(encrypted.to_string())
    }
}
