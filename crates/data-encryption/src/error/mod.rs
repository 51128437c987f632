//! Error types shared across the data encryption crate
//!
//! Two layers:
//!
//! 1. **`CommonError`**: failures outside the cipher itself (configuration,
//!    secret-store backends, key material validation, missing secrets,
//!    internal invariant violations).
//! 2. **`EncryptionError`**: the taxonomy callers of the encrypter act on. It
//!    embeds `CommonError` through a transparent variant.
//!
//! Both implement [`ErrorClassification`]. The key provider, the decrypt
//! path and start-up verification attach `severity` and `retryable` to their
//! log events from it, and verification escalates critical failures to
//! `error!`.
//!
//! | Severity | Raised for |
//! |----------|------------|
//! | **Info** | Secret alias not present in the store |
//! | **Warning** | Transient secret store outage |
//! | **Error** | Bad configuration, malformed ciphertext, permanent backend faults |
//! | **Critical** | Missing or unusable keys, failed decryption, internal cipher faults |
//!
//! ```rust
//! use edc_data_encryption::error::{CommonError, ErrorClassification, ErrorSeverity};
//!
//! let err = CommonError::config_field("edc.data.encryption.caching.seconds", "must be > 0");
//! assert_eq!(err.severity(), ErrorSeverity::Error);
//! assert_eq!(err.kind(), "config");
//! ```

mod encryption;

use std::fmt;

use thiserror::Error;

pub use encryption::{EncryptionError, EncryptionResult};

/// Result type for operations failing with [`CommonError`]
pub type CommonResult<T> = Result<T, CommonError>;

/// Non-cryptographic failures
#[derive(Debug, Clone, Error)]
pub enum CommonError {
    /// A setting is missing, unparseable or inconsistent
    #[error("Invalid configuration{}: {message}", in_setting(.setting))]
    Config { setting: Option<String>, message: String },

    /// The secret store (or another backend) could not answer
    #[error("Secret backend '{service}' failed: {message}")]
    Backend { service: String, message: String, retryable: bool },

    /// Input rejected before it reached the cipher
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A named resource does not exist
    #[error("{resource} not found: '{id}'")]
    NotFound { resource: String, id: String },

    /// An invariant the crate relies on was broken
    #[error("Internal error in '{context}': {message}")]
    Internal { context: String, message: String },
}

fn in_setting(setting: &Option<String>) -> String {
    setting.as_deref().map(|name| format!(" for '{name}'")).unwrap_or_default()
}

impl CommonError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { setting: None, message: message.into() }
    }

    pub fn config_field<F: Into<String>, S: Into<String>>(setting: F, message: S) -> Self {
        Self::Config { setting: Some(setting.into()), message: message.into() }
    }

    pub fn backend<S: Into<String>, M: Into<String>>(
        service: S,
        message: M,
        retryable: bool,
    ) -> Self {
        Self::Backend { service: service.into(), message: message.into(), retryable }
    }

    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound { resource: resource.into(), id: id.into() }
    }

    pub fn internal<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Self::Internal { context: context.into(), message: message.into() }
    }

    /// Short variant name used as the `error_type` log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Backend { .. } => "backend",
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Internal { .. } => "internal",
        }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { retryable: true, .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } => ErrorSeverity::Info,
            Self::Backend { retryable: true, .. } => ErrorSeverity::Warning,
            Self::Config { .. } | Self::Backend { .. } | Self::Validation { .. } => {
                ErrorSeverity::Error
            }
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Retry and alerting classification shared by the crate's error types
pub trait ErrorClassification {
    /// Whether the same call may succeed if repeated, e.g. after a secret
    /// store outage
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Whether the failure leaves the encrypter unable to serve requests
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Severity attached to logged failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML: {err}"))
    }
}
