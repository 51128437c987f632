//! Encryption error taxonomy
//!
//! Maps every failure the encrypter can surface to one typed variant. Only
//! `AuthenticationFailure` is ever interpreted by this crate (the facade
//! treats it as "wrong key, try the next one"); every other variant is
//! terminal and propagates unchanged.

use thiserror::Error;

use super::{CommonError, ErrorClassification, ErrorSeverity};

/// Encryption error type
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Key material is not 16, 24 or 32 bytes long
    #[error("Expected a key size of 16, 24 or 32 bytes but found {actual}")]
    InvalidKeySize { actual: usize },

    /// Input is not a decodable envelope
    #[error("Malformed ciphertext: {reason}")]
    MalformedCiphertext { reason: String },

    /// GCM tag did not validate for the key that was tried
    #[error("AES-GCM authentication failed")]
    AuthenticationFailure,

    /// The secret store returned no usable key material
    ///
    /// `retryable` is set when the store itself reported a transient fault.
    #[error("No encryption key available for alias '{alias}': {reason}")]
    NoKeyAvailable { alias: String, reason: String, retryable: bool },

    /// Every candidate key was tried and none authenticated the envelope
    #[error(
        "Failed to decrypt data. This can happen if the key set is empty, contains invalid \
         keys, the decryption key rotated out of the key set or because the data was \
         encrypted by a different algorithm."
    )]
    DecryptionFailed,

    /// Configured algorithm is neither `AES` nor `NONE`
    #[error("Unsupported encryption algorithm '{0}'. Supported algorithms are 'AES', 'NONE'.")]
    UnsupportedAlgorithm(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Encryption result type
pub type EncryptionResult<T> = Result<T, EncryptionError>;

impl EncryptionError {
    /// Create a malformed ciphertext error
    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        Self::MalformedCiphertext { reason: reason.into() }
    }

    /// Create a missing key error for an alias
    pub fn no_key<A: Into<String>, S: Into<String>>(alias: A, reason: S) -> Self {
        Self::NoKeyAvailable { alias: alias.into(), reason: reason.into(), retryable: false }
    }

    /// Create a missing key error caused by a secret store fault
    pub fn store_unavailable<A: Into<String>>(alias: A, cause: &CommonError) -> Self {
        Self::NoKeyAvailable {
            alias: alias.into(),
            reason: cause.to_string(),
            retryable: cause.is_retryable(),
        }
    }

    /// Whether this failure means "this key did not authenticate the data"
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailure)
    }
}

impl ErrorClassification for EncryptionError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::NoKeyAvailable { retryable, .. } => *retryable,
            Self::Common(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MalformedCiphertext { .. } | Self::UnsupportedAlgorithm(_) => {
                ErrorSeverity::Error
            }
            Self::NoKeyAvailable { retryable: true, .. } => ErrorSeverity::Warning,
            Self::InvalidKeySize { .. }
            | Self::AuthenticationFailure
            | Self::NoKeyAvailable { .. }
            | Self::DecryptionFailed => ErrorSeverity::Critical,
            Self::Common(err) => err.severity(),
        }
    }
}
