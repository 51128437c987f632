//! Key resolution from the external secret store
//!
//! A [`KeyProvider`] yields the current encryption key and the ordered set of
//! decryption candidates. [`VaultKeyProvider`] resolves both from one alias in
//! a [`SecretStore`] on every call; wrap it in
//! [`CachingKeyProvider`](super::CachingKeyProvider) to bound store reads.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::keys::{AesKey, KeySet};
use super::secret_store::SecretStore;
use crate::error::{CommonError, EncryptionError, EncryptionResult, ErrorClassification};

/// Source of key material for the encrypter
pub trait KeyProvider: Send + Sync {
    /// The newest key; all new ciphertext is produced with it
    fn current_encryption_key(&self) -> EncryptionResult<AesKey>;

    /// Every key still valid for decryption, newest first
    fn decryption_keys(&self) -> EncryptionResult<KeySet>;
}

impl<P: KeyProvider + ?Sized> KeyProvider for Arc<P> {
    fn current_encryption_key(&self) -> EncryptionResult<AesKey> {
        (**self).current_encryption_key()
    }

    fn decryption_keys(&self) -> EncryptionResult<KeySet> {
        (**self).decryption_keys()
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for Box<P> {
    fn current_encryption_key(&self) -> EncryptionResult<AesKey> {
        (**self).current_encryption_key()
    }

    fn decryption_keys(&self) -> EncryptionResult<KeySet> {
        (**self).decryption_keys()
    }
}

/// Key provider reading a key-set value from a secret store alias
#[derive(Clone)]
pub struct VaultKeyProvider {
    store: Arc<dyn SecretStore>,
    alias: String,
}

impl VaultKeyProvider {
    pub fn new<S: Into<String>>(store: Arc<dyn SecretStore>, alias: S) -> Self {
        Self { store, alias: alias.into() }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Resolve and parse the key set behind the alias
    ///
    /// # Errors
    /// - [`EncryptionError::NoKeyAvailable`] if the store faults, the alias is
    ///   unknown, or the value holds no decodable key
    /// - [`EncryptionError::InvalidKeySize`] if a key has the wrong length
    #[instrument(skip(self), fields(alias = %self.alias))]
    pub fn resolve_key_set(&self) -> EncryptionResult<KeySet> {
        let raw = match self.store.resolve(&self.alias) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                let missing = CommonError::not_found("Secret", &self.alias);
                warn!(severity = %missing.severity(), "Key alias not found in secret store");
                return Err(EncryptionError::no_key(&self.alias, missing.to_string()));
            }
            Err(err) => {
                warn!(
                    error_type = err.kind(),
                    severity = %err.severity(),
                    retryable = err.is_retryable(),
                    "Secret store lookup failed"
                );
                return Err(EncryptionError::store_unavailable(&self.alias, &err));
            }
        };

        let keys = KeySet::parse(raw.expose()).map_err(|err| match err {
            EncryptionError::Common(common) => {
                EncryptionError::no_key(&self.alias, common.to_string())
            }
            other => other,
        })?;

        debug!(key_count = keys.len(), "Resolved key set");
        Ok(keys)
    }
}

impl KeyProvider for VaultKeyProvider {
    fn current_encryption_key(&self) -> EncryptionResult<AesKey> {
        self.resolve_key_set().map(|keys| keys.current().clone())
    }

    fn decryption_keys(&self) -> EncryptionResult<KeySet> {
        self.resolve_key_set()
    }
}

impl std::fmt::Debug for VaultKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKeyProvider").field("alias", &self.alias).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for security::key_provider.
    use super::*;
    use crate::error::CommonResult;
    use crate::security::{InMemorySecretStore, KeySize, SecureString};

    const ALIAS: &str = "edc.data.encryption.key";

    fn provider_with(value: Option<&str>) -> VaultKeyProvider {
        let store = InMemorySecretStore::new();
        if let Some(value) = value {
            store.put(ALIAS, value);
        }
        VaultKeyProvider::new(Arc::new(store), ALIAS)
    }

    struct FailingStore;

    impl SecretStore for FailingStore {
        fn resolve(&self, _alias: &str) -> CommonResult<Option<SecureString>> {
            Err(CommonError::backend("vault", "connection refused", true))
        }
    }

    /// Validates the first listed key is the current encryption key.
    ///
    /// Assertions:
    /// - Confirms `current_encryption_key()` equals the first key.
    /// - Confirms `decryption_keys()` lists all keys in stored order.
    #[test]
    fn test_current_key_is_first_listed() {
        let k1 = AesKey::generate(KeySize::Aes128);
        let k2 = AesKey::generate(KeySize::Aes128);
        let value = format!("{},{}", k1.to_base64().expose(), k2.to_base64().expose());
        let provider = provider_with(Some(&value));

        assert_eq!(provider.current_encryption_key().unwrap(), k1);
        let keys = provider.decryption_keys().unwrap();
        assert_eq!(keys.iter().cloned().collect::<Vec<_>>(), vec![k1, k2]);
    }

    /// Validates an unknown alias fails with `NoKeyAvailable`.
    #[test]
    fn test_missing_alias_is_no_key_available() {
        let err = provider_with(None).current_encryption_key().unwrap_err();
        assert!(matches!(err, EncryptionError::NoKeyAvailable { ref alias, .. } if alias == ALIAS));
        assert_eq!(
            err.to_string(),
            "No encryption key available for alias 'edc.data.encryption.key': \
             Secret not found: 'edc.data.encryption.key'"
        );
    }

    /// Validates empty or undecodable values fail with `NoKeyAvailable`.
    ///
    /// Assertions:
    /// - Ensures `""`, `" , "` and non-base64 input all map to
    ///   `NoKeyAvailable`.
    #[test]
    fn test_unusable_values_are_no_key_available() {
        for value in ["", " , ", "%%%not-base64%%%"] {
            let err = provider_with(Some(value)).decryption_keys().unwrap_err();
            assert!(
                matches!(err, EncryptionError::NoKeyAvailable { .. }),
                "{value:?} produced {err:?}"
            );
        }
    }

    #[test]
    fn test_wrong_key_length_is_invalid_key_size() {
        let err = provider_with(Some("AAAAAAAAAAA=")).decryption_keys().unwrap_err();
        assert!(matches!(err, EncryptionError::InvalidKeySize { actual: 8 }));
    }

    /// Validates store faults surface as `NoKeyAvailable` carrying the
    /// store's retryability.
    #[test]
    fn test_store_fault_is_no_key_available() {
        let provider = VaultKeyProvider::new(Arc::new(FailingStore), ALIAS);
        let err = provider.decryption_keys().unwrap_err();
        assert!(err.is_retryable());
        match err {
            EncryptionError::NoKeyAvailable { reason, retryable, .. } => {
                assert!(reason.contains("connection refused"));
                assert!(retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Validates a missing alias is reported as critical and not retryable.
    #[test]
    fn test_missing_alias_is_critical() {
        let err = provider_with(None).decryption_keys().unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.is_critical());
    }

    #[test]
    fn test_error_message_does_not_contain_key_material() {
        let provider = provider_with(Some("7h6sh6t6tchCmNnHjK2kFA==,%%%"));
        let err = provider.decryption_keys().unwrap_err();
        assert!(!err.to_string().contains("7h6sh6t6tchCmNnHjK2kFA=="));
    }
}
