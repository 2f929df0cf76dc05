//! Password file backend.
//!
//! Each non-empty line not starting with `#` is `user:hash` where the hash is
//! an argon2 PHC string. The file is read on every verification, so edits take
//! effect without a restart.

use crate::auth::{
    registry::BackendOptions,
    verifier::{BoxFuture, CredentialVerifier},
};
use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{self, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::{rngs::OsRng, RngCore};
use std::{path::PathBuf, sync::Arc};
use tracing::debug;

pub const PLUGIN_NAME: &str = "htpasswd";

/// Factory registered under [`PLUGIN_NAME`]. Options: `file` (required).
///
/// # Errors
/// Returns an error if the `file` option is missing.
pub fn factory(options: &BackendOptions) -> Result<Arc<dyn CredentialVerifier>> {
    let file = options.required("file")?;
    Ok(Arc::new(HtpasswdVerifier::new(file)))
}

#[derive(Clone, Debug)]
pub struct HtpasswdVerifier {
    path: PathBuf,
}

impl HtpasswdVerifier {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialVerifier for HtpasswdVerifier {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn verify<'a>(&'a self, user: &'a str, password: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let content = tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("failed to read {}", self.path.display()))?;

            let Some(hash) = find_hash(&content, user) else {
                debug!("User {user:?} not found in {}", self.path.display());
                return Ok(false);
            };

            // argon2 is deliberately slow, keep it off the async workers.
            let hash = hash.to_string();
            let password = password.to_string();
            tokio::task::spawn_blocking(move || verify_password(&hash, &password))
                .await
                .context("password verification task failed")?
        })
    }
}

fn find_hash<'a>(content: &'a str, user: &str) -> Option<&'a str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| *name == user)
        .map(|(_, hash)| hash)
}

fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("malformed password hash: {e}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("password verification failed: {e}")),
    }
}

/// Hash `password` into a PHC string suitable for the password file.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .context("failed to generate salt")?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!("invalid salt: {e}"))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}
