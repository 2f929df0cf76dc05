use anyhow::Result;
use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Credential check capability implemented by every auth backend.
///
/// `verify` may suspend on I/O. An `Err` means the backend could not reach a
/// decision and is propagated to the caller as is; only `Ok(false)` is a
/// denial.
pub trait CredentialVerifier: Send + Sync {
    /// Plugin name used in logs.
    fn name(&self) -> &str;

    fn verify<'a>(&'a self, user: &'a str, password: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// Release backend resources, called once at shutdown.
    fn cleanup(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
