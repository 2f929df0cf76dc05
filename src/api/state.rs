use crate::auth::SessionAuthority;
use std::sync::Arc;

/// Shared handler state, injected as an `Extension`.
#[derive(Clone)]
pub struct ApiState {
    authority: Arc<SessionAuthority>,
    default_expire_seconds: u64,
}

impl ApiState {
    #[must_use]
    pub fn new(authority: Arc<SessionAuthority>) -> Self {
        Self {
            authority,
            default_expire_seconds: 0,
        }
    }

    /// Lifetime of sessions opened by logins that don't ask for one. 0 = never expire.
    #[must_use]
    pub fn with_default_expire_seconds(mut self, seconds: u64) -> Self {
        self.default_expire_seconds = seconds;
        self
    }

    #[must_use]
    pub fn authority(&self) -> &SessionAuthority {
        &self.authority
    }

    #[must_use]
    pub fn default_expire_seconds(&self) -> u64 {
        self.default_expire_seconds
    }
}
