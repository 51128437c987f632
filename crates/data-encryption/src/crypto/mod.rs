//! Cryptographic primitives: nonce generation, envelope framing and AES-GCM.
//!
//! - **`crypto`** (this module): stateless AES-GCM primitives
//! - **`security`**: key material, secret-store access and key caching
//! - **`encrypter`**: the string-in/string-out facade combining both

pub mod aes;
pub mod envelope;
pub mod nonce;

pub use aes::{AesGcmAlgorithm, DecryptAttempt};
pub use envelope::{Envelope, TAG_LEN};
pub use nonce::{Nonce, NonceGenerator, NONCE_LEN};
