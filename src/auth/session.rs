//! Session records and the monotonic clock used for expiry.

use super::error::AuthError;
use tokio::time::Instant;

/// Authenticated session bound to a token.
///
/// `expire_at` is measured in whole seconds on the authority's monotonic
/// clock; `0` marks a session that never expires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    user: String,
    expire_at: u64,
}

impl Session {
    /// # Errors
    /// Returns `AuthError::InvalidSession` if the user is empty or not trimmed.
    pub fn new(user: impl Into<String>, expire_at: u64) -> Result<Self, AuthError> {
        let user = user.into();
        if user.is_empty() {
            return Err(AuthError::InvalidSession("empty user"));
        }
        if user.trim() != user {
            return Err(AuthError::InvalidSession("user is not trimmed"));
        }
        Ok(Self { user, expire_at })
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn expire_at(&self) -> u64 {
        self.expire_at
    }

    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.expire_at == 0
    }

    /// Whether the session is still usable at `now`.
    #[must_use]
    pub fn is_alive(&self, now: u64) -> bool {
        self.is_permanent() || now < self.expire_at
    }
}

/// Whole seconds elapsed since the clock was created.
///
/// Backed by `tokio::time::Instant`, so it never goes backwards on wall-clock
/// changes and follows paused time in tests.
#[derive(Clone, Copy, Debug)]
pub(super) struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub(super) fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub(super) fn now(&self) -> u64 {
        self.epoch.elapsed().as_secs()
    }

    /// Absolute expiry for a session lasting `expire_seconds`, `0` for never.
    pub(super) fn expire_at(&self, expire_seconds: u64) -> u64 {
        if expire_seconds == 0 {
            0
        } else {
            self.now().saturating_add(expire_seconds)
        }
    }
}
