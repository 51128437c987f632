//! Read-only access to the external secret store
//!
//! The store maps an alias to a comma-separated list of base64 keys, newest
//! first. This crate never writes key material back; the `put`/`remove`
//! helpers on [`InMemorySecretStore`] exist for embedding and tests, where
//! overwriting an alias models a key rotation.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::SecureString;
use crate::error::{CommonError, CommonResult};

/// Source of stored key-set values
///
/// `Ok(None)` means the alias is unknown. `Err` is a store fault; callers
/// do not retry it.
pub trait SecretStore: Send + Sync {
    fn resolve(&self, alias: &str) -> CommonResult<Option<SecureString>>;
}

impl<S: SecretStore + ?Sized> SecretStore for Arc<S> {
    fn resolve(&self, alias: &str) -> CommonResult<Option<SecureString>> {
        (**self).resolve(alias)
    }
}

/// Thread-safe in-process secret store
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, SecureString>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace the value for `alias`
    pub fn put<A: Into<String>, V: Into<SecureString>>(&self, alias: A, value: V) {
        let alias = alias.into();
        debug!(alias = %alias, "Secret stored");
        self.secrets.write().insert(alias, value.into());
    }

    /// Remove `alias`, returning whether it was present
    pub fn remove(&self, alias: &str) -> bool {
        self.secrets.write().remove(alias).is_some()
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }
}

impl SecretStore for InMemorySecretStore {
    fn resolve(&self, alias: &str) -> CommonResult<Option<SecureString>> {
        Ok(self.secrets.read().get(alias).cloned())
    }
}

impl std::fmt::Debug for InMemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySecretStore").field("aliases", &self.len()).finish()
    }
}

/// Secret store backed by process environment variables
///
/// The alias `edc.datasource.key` is read from `EDC_DATASOURCE_KEY`
/// (upper-cased, every non-alphanumeric character replaced by `_`), with an
/// optional prefix prepended verbatim.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore {
    prefix: Option<String>,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read variables named `<prefix><ALIAS>`
    pub fn with_prefix<S: Into<String>>(prefix: S) -> Self {
        Self { prefix: Some(prefix.into()) }
    }

    /// Environment variable consulted for `alias`
    pub fn variable_name(&self, alias: &str) -> String {
        let normalized: String = alias
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();

        match &self.prefix {
            Some(prefix) => format!("{prefix}{normalized}"),
            None => normalized,
        }
    }
}

impl SecretStore for EnvSecretStore {
    fn resolve(&self, alias: &str) -> CommonResult<Option<SecureString>> {
        let var_name = self.variable_name(alias);
        match env::var(&var_name) {
            Ok(value) => Ok(Some(SecureString::new(value))),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => {
                warn!(variable = %var_name, "Environment secret is not valid unicode");
                Err(CommonError::backend(
                    "environment",
                    format!("Environment variable {var_name} is not valid unicode"),
                    false,
                ))
            }
        }
    }
}
