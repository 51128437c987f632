//! Symmetric data encryption for connector payloads.
//!
//! Encrypts opaque string values (secrets, cached tokens) with AES-GCM under a
//! rotating key set read from an external secret store.
//!
//! # Layers
//!
//! - [`crypto`]: nonce generation, envelope framing, AES-GCM
//! - [`security`]: key material, secret stores, key providers and caching
//! - [`encrypter`]: the [`DataEncrypter`] facade
//! - [`config`] / [`factory`]: settings and construction of the configured
//!   encrypter
//!
//! # Key rotation
//!
//! The secret store holds a comma-separated list of base64 keys, newest
//! first. New data is always encrypted under the first key; decryption tries
//! every listed key, so data written under a retired key stays readable for
//! as long as that key remains in the list.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use edc_data_encryption::{DataEncrypterFactory, EncryptionConfig, InMemorySecretStore};
//!
//! let store = Arc::new(InMemorySecretStore::new());
//! store.put("edc-keys", "7h6sh6t6tchCmNnHjK2kFA==");
//!
//! let factory = DataEncrypterFactory::new(store);
//! let config = EncryptionConfig::aes("edc-keys").with_caching(300);
//! assert_eq!(factory.verify(&config)?, 1);
//!
//! let encrypter = factory.create(&config)?;
//! let ciphertext = encrypter.encrypt("hello world!")?;
//! assert_eq!(encrypter.decrypt(&ciphertext)?, "hello world!");
//! # Ok::<(), edc_data_encryption::EncryptionError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod clock;
pub mod config;
pub mod crypto;
pub mod encrypter;
pub mod error;
pub mod factory;
pub mod security;

pub use config::{EncryptionAlgorithm, EncryptionConfig};
pub use encrypter::{AesDataEncrypter, DataEncrypter, NoneDataEncrypter};
pub use error::{EncryptionError, EncryptionResult};
pub use factory::DataEncrypterFactory;
pub use security::{
    CachingKeyProvider, EnvSecretStore, InMemorySecretStore, KeyProvider, SecretStore,
    VaultKeyProvider,
};
