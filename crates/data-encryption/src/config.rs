//! Data encryption settings
//!
//! Settings can come from a flat key/value map, the process environment or a
//! TOML file. All three use the same keys:
//!
//! | Setting | Environment variable | Default |
//! |---|---|---|
//! | `edc.data.encryption.algorithm` | `EDC_DATA_ENCRYPTION_ALGORITHM` | `AES` |
//! | `edc.data.encryption.keys.alias` | `EDC_DATA_ENCRYPTION_KEYS_ALIAS` | required for `AES` |
//! | `edc.data.encryption.caching.enabled` | `EDC_DATA_ENCRYPTION_CACHING_ENABLED` | `false` |
//! | `edc.data.encryption.caching.seconds` | `EDC_DATA_ENCRYPTION_CACHING_SECONDS` | `3600` |
//!
//! A TOML file carries the same values in a `[data_encryption]` table:
//!
//! ```toml
//! [data_encryption]
//! algorithm = "AES"
//! keys_alias = "edc-encryption-keys"
//! caching_enabled = true
//! caching_seconds = 300
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{CommonError, EncryptionError, EncryptionResult};

pub const ALGORITHM_SETTING: &str = "edc.data.encryption.algorithm";
pub const KEYS_ALIAS_SETTING: &str = "edc.data.encryption.keys.alias";
pub const CACHING_ENABLED_SETTING: &str = "edc.data.encryption.caching.enabled";
pub const CACHING_SECONDS_SETTING: &str = "edc.data.encryption.caching.seconds";

pub const DEFAULT_CACHING_SECONDS: u64 = 3600;

/// Encryption strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionAlgorithm {
    #[default]
    Aes,
    None,
}

impl EncryptionAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aes => "AES",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = EncryptionError;

    /// Case-insensitive; surrounding whitespace is ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES" => Ok(Self::Aes),
            "NONE" => Ok(Self::None),
            _ => Err(EncryptionError::UnsupportedAlgorithm(s.trim().to_string())),
        }
    }
}

/// Validated-on-demand encryption settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
    pub algorithm: EncryptionAlgorithm,
    /// Secret store alias holding the key set
    pub keys_alias: Option<String>,
    pub caching_enabled: bool,
    pub caching_seconds: u64,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            algorithm: EncryptionAlgorithm::Aes,
            keys_alias: None,
            caching_enabled: false,
            caching_seconds: DEFAULT_CACHING_SECONDS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    data_encryption: Option<RawSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSection {
    algorithm: Option<String>,
    keys_alias: Option<String>,
    caching_enabled: Option<bool>,
    caching_seconds: Option<u64>,
}

impl EncryptionConfig {
    /// AES with the given alias and caching disabled
    pub fn aes<S: Into<String>>(keys_alias: S) -> Self {
        Self { keys_alias: Some(keys_alias.into()), ..Self::default() }
    }

    /// Encryption disabled
    pub fn none() -> Self {
        Self { algorithm: EncryptionAlgorithm::None, ..Self::default() }
    }

    /// Enable caching with the given TTL in seconds
    pub fn with_caching(mut self, seconds: u64) -> Self {
        self.caching_enabled = true;
        self.caching_seconds = seconds;
        self
    }

    /// Read settings from a flat key/value map
    ///
    /// # Errors
    /// - [`EncryptionError::UnsupportedAlgorithm`] for an unknown algorithm
    /// - [`CommonError::Config`] for unparseable boolean or integer values
    pub fn from_settings(settings: &HashMap<String, String>) -> EncryptionResult<Self> {
        Self::from_lookup(|key| settings.get(key).cloned())
    }

    /// Read settings from environment variables
    ///
    /// Each setting key is upper-cased with `.` replaced by `_`, so
    /// `edc.data.encryption.keys.alias` becomes
    /// `EDC_DATA_ENCRYPTION_KEYS_ALIAS`.
    pub fn from_env() -> EncryptionResult<Self> {
        let config = Self::from_lookup(|key| std::env::var(env_var_name(key)).ok())?;
        info!(
            algorithm = %config.algorithm,
            "Data encryption configuration loaded from environment"
        );
        Ok(config)
    }

    /// Parse the `[data_encryption]` table of a TOML document
    ///
    /// A document without that table yields the defaults.
    pub fn from_toml_str(contents: &str) -> EncryptionResult<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(CommonError::from)?;
        let raw = file.data_encryption.unwrap_or_default();
        let defaults = Self::default();

        let algorithm = match raw.algorithm {
            Some(value) => value.parse()?,
            None => defaults.algorithm,
        };

        Ok(Self {
            algorithm,
            keys_alias: raw.keys_alias,
            caching_enabled: raw.caching_enabled.unwrap_or(defaults.caching_enabled),
            caching_seconds: raw.caching_seconds.unwrap_or(defaults.caching_seconds),
        })
    }

    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> EncryptionResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading data encryption configuration");

        let contents = std::fs::read_to_string(path).map_err(|e| {
            CommonError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)?;

        info!(
            path = %path.display(),
            algorithm = %config.algorithm,
            "Data encryption configuration loaded from file"
        );
        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> EncryptionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let algorithm = match value(ALGORITHM_SETTING) {
            Some(raw) => raw.parse()?,
            None => defaults.algorithm,
        };
        let caching_enabled = match value(CACHING_ENABLED_SETTING) {
            Some(raw) => parse_bool(CACHING_ENABLED_SETTING, &raw)?,
            None => defaults.caching_enabled,
        };
        let caching_seconds = match value(CACHING_SECONDS_SETTING) {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                CommonError::config_field(
                    CACHING_SECONDS_SETTING,
                    format!("Invalid number of seconds '{raw}': {e}"),
                )
            })?,
            None => defaults.caching_seconds,
        };

        let keys_alias = value(KEYS_ALIAS_SETTING);
        Ok(Self { algorithm, keys_alias, caching_enabled, caching_seconds })
    }

    /// Check the settings are usable for the selected algorithm
    ///
    /// # Errors
    /// [`CommonError::Config`] if `AES` has no alias or caching is enabled
    /// with a zero TTL.
    pub fn validate(&self) -> EncryptionResult<()> {
        if self.algorithm == EncryptionAlgorithm::Aes {
            self.require_alias()?;
        }
        if self.caching_enabled && self.caching_seconds == 0 {
            return Err(CommonError::config_field(
                CACHING_SECONDS_SETTING,
                "Caching is enabled but the cache duration is 0 seconds",
            )
            .into());
        }
        Ok(())
    }

    /// The configured alias, trimmed
    ///
    /// # Errors
    /// [`CommonError::Config`] if it is missing or blank.
    pub fn require_alias(&self) -> EncryptionResult<&str> {
        match self.keys_alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => Ok(alias),
            _ => Err(CommonError::config_field(
                KEYS_ALIAS_SETTING,
                format!("Missing setting {KEYS_ALIAS_SETTING}"),
            )
            .into()),
        }
    }

    /// Cache TTL, if caching is enabled
    pub fn caching_ttl(&self) -> Option<Duration> {
        self.caching_enabled.then(|| Duration::from_secs(self.caching_seconds))
    }
}

/// Environment variable name for a setting key
pub fn env_var_name(setting: &str) -> String {
    setting.to_ascii_uppercase().replace('.', "_")
}

fn parse_bool(field: &str, raw: &str) -> EncryptionResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CommonError::config_field(field, format!("Invalid boolean '{raw}'")).into()),
    }
}
