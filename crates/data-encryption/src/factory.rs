//! Builds the configured [`DataEncrypter`]
//!
//! `AES` yields an [`AesDataEncrypter`] over a [`VaultKeyProvider`], wrapped
//! in a [`CachingKeyProvider`] when caching is enabled. `NONE` yields the
//! pass-through [`NoneDataEncrypter`].
//!
//! [`DataEncrypterFactory::verify`] resolves the key alias once so that a
//! missing or unusable key set is reported at start-up instead of on the
//! first encrypt call.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::config::{EncryptionAlgorithm, EncryptionConfig};
use crate::encrypter::{AesDataEncrypter, DataEncrypter, NoneDataEncrypter};
use crate::error::{EncryptionResult, ErrorClassification};
use crate::security::{CachingKeyProvider, SecretStore, VaultKeyProvider};

/// Factory for data encrypters sharing one secret store
#[derive(Clone)]
pub struct DataEncrypterFactory {
    store: Arc<dyn SecretStore>,
}

impl DataEncrypterFactory {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Build the encrypter selected by `config`
    ///
    /// # Errors
    /// Configuration errors from [`EncryptionConfig::validate`]. Key material
    /// is not read here.
    #[instrument(skip_all, fields(algorithm = %config.algorithm))]
    pub fn create(&self, config: &EncryptionConfig) -> EncryptionResult<Box<dyn DataEncrypter>> {
        config.validate()?;

        match config.algorithm {
            EncryptionAlgorithm::None => {
                warn!("Data encryption is disabled, values are stored in plain text");
                Ok(Box::new(NoneDataEncrypter))
            }
            EncryptionAlgorithm::Aes => {
                let alias = config.require_alias()?;
                let provider = VaultKeyProvider::new(Arc::clone(&self.store), alias);

                match config.caching_ttl() {
                    Some(ttl) => {
                        info!(
                            ttl_secs = ttl.as_secs(),
                            "AES data encryption enabled with key caching"
                        );
                        let cached = CachingKeyProvider::new(provider, ttl);
                        Ok(Box::new(AesDataEncrypter::new(cached)))
                    }
                    None => {
                        info!("AES data encryption enabled");
                        Ok(Box::new(AesDataEncrypter::new(provider)))
                    }
                }
            }
        }
    }

    /// Check the configured key set can be resolved
    ///
    /// Returns the number of registered keys, or `0` when encryption is
    /// disabled.
    ///
    /// # Errors
    /// - Configuration errors from [`EncryptionConfig::validate`]
    /// - [`EncryptionError::NoKeyAvailable`](crate::error::EncryptionError::NoKeyAvailable)
    ///   if the alias is unknown or holds no usable key
    /// - [`EncryptionError::InvalidKeySize`](crate::error::EncryptionError::InvalidKeySize)
    ///   if a key has the wrong length
    #[instrument(skip_all, fields(algorithm = %config.algorithm))]
    pub fn verify(&self, config: &EncryptionConfig) -> EncryptionResult<usize> {
        config.validate()?;

        match config.algorithm {
            EncryptionAlgorithm::None => Ok(0),
            EncryptionAlgorithm::Aes => {
                let alias = config.require_alias()?;
                let provider = VaultKeyProvider::new(Arc::clone(&self.store), alias);
                match provider.resolve_key_set() {
                    Ok(keys) => {
                        info!(alias, registered_keys = keys.len(), "Data encryption keys verified");
                        Ok(keys.len())
                    }
                    Err(err) if err.is_critical() => {
                        error!(
                            alias,
                            severity = %err.severity(),
                            error = %err,
                            "Data encryption key set is unusable"
                        );
                        Err(err)
                    }
                    Err(err) => {
                        warn!(
                            alias,
                            severity = %err.severity(),
                            retryable = err.is_retryable(),
                            error = %err,
                            "Data encryption keys could not be verified"
                        );
                        Err(err)
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for DataEncrypterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataEncrypterFactory").finish_non_exhaustive()
    }
}
