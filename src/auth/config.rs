use super::{totp::TotpSecretSource, verifier::CredentialVerifier};
use std::{collections::HashSet, fmt, sync::Arc};

/// Startup configuration of a [`super::SessionAuthority`].
///
/// Built once with the `with_*` methods and consumed by the authority; it is
/// never changed afterwards.
#[derive(Clone)]
pub struct AuthorityConfig {
    pub(super) enabled: bool,
    pub(super) unauthenticated_paths: HashSet<String>,
    pub(super) internal: Option<Arc<dyn CredentialVerifier>>,
    pub(super) external: Option<Arc<dyn CredentialVerifier>>,
    pub(super) force_internal_users: HashSet<String>,
    pub(super) totp_secret_source: Option<Arc<dyn TotpSecretSource>>,
}

impl AuthorityConfig {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            unauthenticated_paths: HashSet::new(),
            internal: None,
            external: None,
            force_internal_users: HashSet::new(),
            totp_secret_source: None,
        }
    }

    #[must_use]
    pub fn with_unauthenticated_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unauthenticated_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_internal(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.internal = Some(verifier);
        self
    }

    #[must_use]
    pub fn with_external(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.external = Some(verifier);
        self
    }

    #[must_use]
    pub fn with_force_internal_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.force_internal_users = users.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_totp_secret_source(mut self, source: Arc<dyn TotpSecretSource>) -> Self {
        self.totp_secret_source = Some(source);
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn unauthenticated_paths(&self) -> &HashSet<String> {
        &self.unauthenticated_paths
    }

    #[must_use]
    pub fn force_internal_users(&self) -> &HashSet<String> {
        &self.force_internal_users
    }
}

impl fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("enabled", &self.enabled)
            .field("unauthenticated_paths", &self.unauthenticated_paths)
            .field("internal", &self.internal.as_ref().map(|v| v.name()))
            .field("external", &self.external.as_ref().map(|v| v.name()))
            .field("force_internal_users", &self.force_internal_users)
            .field("totp", &self.totp_secret_source.is_some())
            .finish()
    }
}
