//! Backend lookup: turns a plugin name plus options into a verifier.

use super::{backends, error::AuthError, verifier::CredentialVerifier};
use anyhow::{anyhow, Context, Result};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Builds a verifier from its options.
pub type BackendFactory = fn(&BackendOptions) -> Result<Arc<dyn CredentialVerifier>>;

/// `key=value` options handed to a backend factory.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    values: BTreeMap<String, String>,
}

impl BackendOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` pairs; entries without `=` are rejected.
    ///
    /// # Errors
    /// Returns an error on a malformed pair or an empty key.
    pub fn parse<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected key=value, got {pair:?}"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow!("empty option name in {pair:?}"));
            }
            values.insert(key.to_string(), value.trim().to_string());
        }
        Ok(Self { values })
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// # Errors
    /// Returns an error if the option is missing or empty.
    pub fn required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("missing required option {key:?}"))
    }

    /// # Errors
    /// Returns an error if the option is present but not an unsigned integer.
    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64> {
        self.get(key).map_or(Ok(default), |value| {
            value
                .parse()
                .with_context(|| format!("option {key:?} must be an unsigned integer"))
        })
    }

    /// # Errors
    /// Returns an error if the option is present but not a boolean.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        self.get(key).map_or(Ok(default), |value| {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(anyhow!("option {key:?} must be a boolean, got {value:?}")),
            }
        })
    }
}

// Values may hold credentials.
impl fmt::Debug for BackendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.keys()).finish()
    }
}

/// Name -> factory table, built once at startup.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled `htpasswd` and `http` backends.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with_backend(backends::htpasswd::PLUGIN_NAME, backends::htpasswd::factory)
            .with_backend(backends::http::PLUGIN_NAME, backends::http::factory)
    }

    #[must_use]
    pub fn with_backend(mut self, name: &str, factory: BackendFactory) -> Self {
        self.factories.insert(name.to_string(), factory);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate backend `name`.
    ///
    /// # Errors
    /// Returns `AuthError::UnknownBackend` for unregistered names and
    /// `AuthError::BackendConfig` if the factory rejects the options.
    pub fn build(
        &self,
        name: &str,
        options: &BackendOptions,
    ) -> Result<Arc<dyn CredentialVerifier>, AuthError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| AuthError::UnknownBackend(name.to_string()))?;
        factory(options).map_err(|source| AuthError::BackendConfig {
            name: name.to_string(),
            source,
        })
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
