use thiserror::Error;

/// Errors raised by the session authority.
///
/// Authentication failures are not errors: they surface as `Ok(false)` or
/// `Ok(None)`. Everything here is either a broken contract, a broken
/// environment, or an infrastructure failure that must not be mistaken for a
/// wrong password.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization is disabled")]
    Disabled,
    #[error("invalid user name: {0:?}")]
    InvalidUser(String),
    #[error("invalid session: {0}")]
    InvalidSession(&'static str),
    #[error("can't generate new unique token")]
    TokenExhausted,
    #[error("random source failure")]
    Entropy(#[source] anyhow::Error),
    #[error("internal auth backend is required when authorization is enabled")]
    MissingInternalBackend,
    #[error("unknown auth backend: {0}")]
    UnknownBackend(String),
    #[error("invalid configuration for auth backend {name}")]
    BackendConfig {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("auth backend {name} failed")]
    Backend {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to read TOTP secret")]
    TotpSecret(#[source] anyhow::Error),
    #[error("auth backend cleanup failed: {}", join_failures(.0))]
    Cleanup(Vec<anyhow::Error>),
}

fn join_failures(failures: &[anyhow::Error]) -> String {
    failures
        .iter()
        .map(|err| format!("{err:#}"))
        .collect::<Vec<_>>()
        .join("; ")
}
