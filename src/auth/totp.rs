//! TOTP second factor appended to the password.
//!
//! When a secret is configured the last six characters of the submitted
//! password are the one-time code and everything before them is the password
//! handed to the backend. Codes are SHA1, 6 digits, 30 second steps, and one
//! step of skew is accepted in either direction.

use super::verifier::BoxFuture;
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use totp_rs::{Algorithm, Secret, TOTP};

pub const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

/// Source of the current TOTP shared secret (base32).
///
/// Read on every authorization attempt so the secret can be rotated without a
/// restart. An empty secret disables the second factor.
pub trait TotpSecretSource: Send + Sync {
    fn read_secret(&self) -> BoxFuture<'_, Result<SecretString>>;
}

/// Secret kept in a file, re-read on each call.
#[derive(Clone, Debug)]
pub struct FileSecretSource {
    path: PathBuf,
}

impl FileSecretSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TotpSecretSource for FileSecretSource {
    fn read_secret(&self) -> BoxFuture<'_, Result<SecretString>> {
        Box::pin(async move {
            let raw = tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("failed to read TOTP secret {}", self.path.display()))?;
            Ok(SecretString::from(raw.trim().to_string()))
        })
    }
}

/// Fixed secret, mostly useful for embedding and tests.
#[derive(Clone, Debug)]
pub struct StaticSecretSource {
    secret: SecretString,
}

impl StaticSecretSource {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl TotpSecretSource for StaticSecretSource {
    fn read_secret(&self) -> BoxFuture<'_, Result<SecretString>> {
        let secret = self.secret.clone();
        Box::pin(async move { Ok(secret) })
    }
}

/// Split `password` into `(core, code)`, the code being the last six characters.
///
/// Shorter passwords give an empty core and a short code; they are not special
/// cased and simply fail verification later.
#[must_use]
pub fn split_code(password: &str) -> (&str, &str) {
    let at = password
        .char_indices()
        .rev()
        .nth(TOTP_DIGITS - 1)
        .map_or(0, |(index, _)| index);
    password.split_at(at)
}

/// Check `code` against the base32 `secret` for the current time step.
///
/// # Errors
/// Returns an error if the secret is not valid base32 or the system clock is
/// before the unix epoch.
pub fn verify_code(secret: &SecretString, code: &str) -> Result<bool> {
    let totp = totp_for(secret)?;
    totp.check_current(code)
        .map_err(|e| anyhow!("TOTP clock error: {e}"))
}

pub(crate) fn totp_for(secret: &SecretString) -> Result<TOTP> {
    let bytes = Secret::Encoded(secret.expose_secret().to_string())
        .to_bytes()
        .map_err(|e| anyhow!("invalid TOTP secret: {e:?}"))?;

    // Secrets shorter than 128 bits are common in the wild, don't reject them.
    Ok(TOTP::new_unchecked(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        bytes,
        None,
        "user".to_string(),
    ))
}
