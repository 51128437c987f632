//! Key material, secret-store access and key caching
//!
//! # Components
//!
//! - **[`AesKey`] / [`KeySet`]**: validated key material, newest first
//! - **[`SecretStore`]**: read-only source of stored key-set values
//! - **[`VaultKeyProvider`]**: resolves a [`KeySet`] from a store alias
//! - **[`CachingKeyProvider`]**: TTL-bounded decorator over any provider
//!
//! Key bytes and raw store values are zeroed on drop and redacted from
//! `Debug`/`Display`.

pub mod cache;
pub mod key_provider;
pub mod keys;
pub mod secret_store;
pub mod secure_string;

pub use cache::{CachingKeyProvider, KeyCacheStats};
pub use key_provider::{KeyProvider, VaultKeyProvider};
pub use keys::{generate_key_set_value, AesKey, KeySet, KeySize, KEY_SET_DELIMITER};
pub use secret_store::{EnvSecretStore, InMemorySecretStore, SecretStore};
pub use secure_string::SecureString;
