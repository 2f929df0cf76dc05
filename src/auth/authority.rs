//! The session authority: authorization gating, credential checks and the
//! in-memory session table.

use super::{
    config::AuthorityConfig,
    error::AuthError,
    session::{MonotonicClock, Session},
    token, totp,
    totp::TotpSecretSource,
    verifier::CredentialVerifier,
};
use anyhow::anyhow;
use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Owns the session table and the verification policy.
///
/// Construct one per process and share it behind an `Arc`. The table lock is
/// only held for in-memory map operations, never across a backend call.
pub struct SessionAuthority {
    enabled: bool,
    unauthenticated_paths: HashSet<String>,
    internal: Option<Arc<dyn CredentialVerifier>>,
    external: Option<Arc<dyn CredentialVerifier>>,
    force_internal_users: HashSet<String>,
    totp_secret_source: Option<Arc<dyn TotpSecretSource>>,
    sessions: Mutex<HashMap<String, Session>>,
    clock: MonotonicClock,
    cleaned_up: AtomicBool,
}

impl SessionAuthority {
    /// Build the authority from its startup configuration.
    ///
    /// Backends are dropped when authorization is disabled.
    ///
    /// # Errors
    /// Returns `AuthError::MissingInternalBackend` if authorization is enabled
    /// without an internal backend.
    pub fn new(config: AuthorityConfig) -> Result<Self, AuthError> {
        let AuthorityConfig {
            enabled,
            unauthenticated_paths,
            internal,
            external,
            force_internal_users,
            totp_secret_source,
        } = config;

        if !enabled {
            warn!("AUTHORIZATION IS DISABLED");
        }

        for path in &unauthenticated_paths {
            warn!("Authorization is disabled for API {path:?}");
        }

        let (internal, external) = if enabled {
            let internal = internal.ok_or(AuthError::MissingInternalBackend)?;
            info!("Using internal auth service {:?}", internal.name());
            if let Some(external) = &external {
                info!("Using external auth service {:?}", external.name());
            }
            (Some(internal), external)
        } else {
            (None, None)
        };

        Ok(Self {
            enabled,
            unauthenticated_paths,
            internal,
            external,
            force_internal_users,
            totp_secret_source,
            sessions: Mutex::new(HashMap::new()),
            clock: MonotonicClock::new(),
            cleaned_up: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn is_auth_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a request to `path` must carry credentials.
    #[must_use]
    pub fn is_auth_required(&self, path: &str, declares_auth_required: bool) -> bool {
        self.enabled && declares_auth_required && !self.unauthenticated_paths.contains(path)
    }

    /// Verify `user` and `password`, including the TOTP code if one is configured.
    ///
    /// # Errors
    /// Contract violations (`Disabled`, `InvalidUser`) and infrastructure
    /// failures (`TotpSecret`, `Backend`). A denial is `Ok(false)`.
    #[instrument(skip(self, password))]
    pub async fn authorize(&self, user: &str, password: &str) -> Result<bool, AuthError> {
        self.ensure_enabled()?;
        ensure_user(user)?;
        let internal = self
            .internal
            .as_ref()
            .ok_or(AuthError::MissingInternalBackend)?;

        let mut password = password;
        if let Some(source) = &self.totp_secret_source {
            let secret = source.read_secret().await.map_err(AuthError::TotpSecret)?;
            let secret = secret.expose_secret().trim();
            if !secret.is_empty() {
                let secret = SecretString::from(secret.to_string());
                let (core, code) = totp::split_code(password);
                if !totp::verify_code(&secret, code).map_err(AuthError::TotpSecret)? {
                    error!("Got access denied for user {user:?} by TOTP");
                    return Ok(false);
                }
                password = core;
            }
        }

        let service = match &self.external {
            Some(external) if !self.force_internal_users.contains(user) => external,
            _ => internal,
        };

        let name = service.name();
        let ok = service
            .verify(user, password)
            .await
            .map_err(|source| AuthError::Backend {
                name: name.to_string(),
                source,
            })?;

        if ok {
            info!("Authorized user {user:?} via auth service {name:?}");
        } else {
            error!("Got access denied for user {user:?} from auth service {name:?}");
        }

        Ok(ok)
    }

    /// Authorize and open a session, returning its token.
    ///
    /// `expire_seconds == 0` opens a session that never expires.
    ///
    /// # Errors
    /// Same as [`Self::authorize`], plus `TokenExhausted`/`Entropy` if no
    /// unique token can be drawn.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        user: &str,
        password: &str,
        expire_seconds: u64,
    ) -> Result<Option<String>, AuthError> {
        self.ensure_enabled()?;
        ensure_user(user)?;

        if !self.authorize(user, password).await? {
            return Ok(None);
        }

        let session = Session::new(user, self.clock.expire_at(expire_seconds))?;
        let expire_at = session.expire_at();

        let token = {
            let mut sessions = self.sessions.lock().await;
            let token = token::unique_token(
                |candidate| sessions.contains_key(candidate),
                token::generate_session_token,
            )?;
            sessions.insert(token.clone(), session);
            token
        };

        info!("Logged in user {user:?} (expire_at={expire_at})");

        Ok(Some(token))
    }

    /// Resolve `token` to its user, evicting it if it has expired.
    ///
    /// # Errors
    /// Returns `AuthError::Disabled` if authorization is disabled.
    pub async fn check(&self, token: &str) -> Result<Option<String>, AuthError> {
        self.ensure_enabled()?;

        let mut sessions = self.sessions.lock().await;
        // Read the clock only once the lock is held, a contended lock must not
        // stretch a session past its deadline.
        let now = self.clock.now();
        let Some(session) = sessions.get(token) else {
            return Ok(None);
        };
        if session.is_alive(now) {
            return Ok(Some(session.user().to_string()));
        }

        sessions.remove(token);
        drop(sessions);
        debug!("Evicted expired session");

        Ok(None)
    }

    /// Revoke every session of the user owning `token`. Unknown tokens are ignored.
    ///
    /// # Errors
    /// Returns `AuthError::Disabled` if authorization is disabled.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.ensure_enabled()?;

        let mut sessions = self.sessions.lock().await;
        let Some(user) = sessions.get(token).map(|s| s.user().to_string()) else {
            return Ok(());
        };
        let before = sessions.len();
        sessions.retain(|_, session| session.user() != user);
        let count = before - sessions.len();
        drop(sessions);

        info!("Logged out user {user:?} (was={count})");

        Ok(())
    }

    /// Run the backends' cleanup hooks once, at shutdown.
    ///
    /// Both backends are always attempted; every failure is reported in
    /// `AuthError::Cleanup`. The hooks run on their own task so cancelling the
    /// caller does not stop them halfway.
    ///
    /// # Errors
    /// Returns `AuthError::Cleanup` if any backend cleanup failed.
    pub async fn cleanup(&self) -> Result<(), AuthError> {
        if !self.enabled {
            return Ok(());
        }
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            debug!("Auth services already cleaned up");
            return Ok(());
        }

        let backends: Vec<Arc<dyn CredentialVerifier>> = self
            .internal
            .iter()
            .chain(self.external.iter())
            .cloned()
            .collect();

        let task = tokio::spawn(async move {
            let mut failures = Vec::new();
            for backend in backends {
                if let Err(err) = backend.cleanup().await {
                    error!(
                        "Failed to clean up auth service {:?}: {err:#}",
                        backend.name()
                    );
                    failures.push(err.context(format!("auth service {}", backend.name())));
                }
            }
            failures
        });

        let failures = task
            .await
            .map_err(|e| AuthError::Cleanup(vec![anyhow!("cleanup task failed: {e}")]))?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Cleanup(failures))
        }
    }

    fn ensure_enabled(&self) -> Result<(), AuthError> {
        if self.enabled {
            Ok(())
        } else {
            Err(AuthError::Disabled)
        }
    }
}

fn ensure_user(user: &str) -> Result<(), AuthError> {
    if user.is_empty() || user.trim() != user {
        return Err(AuthError::InvalidUser(user.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{totp::totp_for, verifier::BoxFuture, StaticSecretSource};
    use anyhow::Result;
    use std::sync::{atomic::AtomicUsize, Mutex as StdMutex};
    use std::time::Duration;

    const SECRET: &str = "JBSWY3DPEHPK3PXP";

    /// Test double accepting a fixed set of credentials and recording calls.
    struct FakeVerifier {
        name: &'static str,
        users: HashMap<&'static str, &'static str>,
        calls: AtomicUsize,
        passwords: StdMutex<Vec<String>>,
        fail_verify: bool,
        fail_cleanup: bool,
        cleanups: AtomicUsize,
    }

    impl FakeVerifier {
        fn new(name: &'static str, users: &[(&'static str, &'static str)]) -> Self {
            Self {
                name,
                users: users.iter().copied().collect(),
                calls: AtomicUsize::new(0),
                passwords: StdMutex::new(Vec::new()),
                fail_verify: false,
                fail_cleanup: false,
                cleanups: AtomicUsize::new(0),
            }
        }

        fn failing_verify(mut self) -> Self {
            self.fail_verify = true;
            self
        }

        fn failing_cleanup(mut self) -> Self {
            self.fail_cleanup = true;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_password(&self) -> Option<String> {
            self.passwords.lock().unwrap().last().cloned()
        }
    }

    impl CredentialVerifier for FakeVerifier {
        fn name(&self) -> &str {
            self.name
        }

        fn verify<'a>(&'a self, user: &'a str, password: &'a str) -> BoxFuture<'a, Result<bool>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.passwords.lock().unwrap().push(password.to_string());
                if self.fail_verify {
                    return Err(anyhow!("{} unreachable", self.name));
                }
                Ok(self.users.get(user) == Some(&password))
            })
        }

        fn cleanup(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                self.cleanups.fetch_add(1, Ordering::SeqCst);
                if self.fail_cleanup {
                    Err(anyhow!("{} cleanup broke", self.name))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn authority_with(internal: Arc<FakeVerifier>) -> SessionAuthority {
        SessionAuthority::new(AuthorityConfig::new(true).with_internal(internal)).unwrap()
    }

    fn current_code() -> String {
        totp_for(&SecretString::from(SECRET.to_string()))
            .unwrap()
            .generate_current()
            .unwrap()
    }

    fn wrong_code() -> &'static str {
        if current_code() == "000000" {
            "111111"
        } else {
            "000000"
        }
    }

    #[test]
    fn is_auth_required_combines_switch_flag_and_exempt_paths() {
        let internal = Arc::new(FakeVerifier::new("internal", &[]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal)
                .with_unauthenticated_paths(["/export/prometheus/metrics"]),
        )
        .unwrap();

        assert!(authority.is_auth_enabled());
        assert!(authority.is_auth_required("/auth/check", true));
        assert!(!authority.is_auth_required("/auth/check", false));
        assert!(!authority.is_auth_required("/export/prometheus/metrics", true));

        let disabled = SessionAuthority::new(AuthorityConfig::new(false)).unwrap();
        assert!(!disabled.is_auth_enabled());
        assert!(!disabled.is_auth_required("/auth/check", true));
    }

    #[test]
    fn enabled_authority_requires_internal_backend() {
        let result = SessionAuthority::new(AuthorityConfig::new(true));
        assert!(matches!(result, Err(AuthError::MissingInternalBackend)));
    }

    #[tokio::test]
    async fn disabled_authority_rejects_session_operations() {
        let authority = SessionAuthority::new(AuthorityConfig::new(false)).unwrap();
        assert!(matches!(
            authority.authorize("alice", "pw1").await,
            Err(AuthError::Disabled)
        ));
        assert!(matches!(
            authority.login("alice", "pw1", 0).await,
            Err(AuthError::Disabled)
        ));
        assert!(matches!(
            authority.check("token").await,
            Err(AuthError::Disabled)
        ));
        assert!(matches!(
            authority.logout("token").await,
            Err(AuthError::Disabled)
        ));
        assert!(authority.cleanup().await.is_ok());
    }

    #[tokio::test]
    async fn authorize_rejects_empty_or_untrimmed_user() {
        let authority = authority_with(Arc::new(FakeVerifier::new("internal", &[])));
        assert!(matches!(
            authority.authorize("", "pw").await,
            Err(AuthError::InvalidUser(_))
        ));
        assert!(matches!(
            authority.login(" alice ", "pw", 0).await,
            Err(AuthError::InvalidUser(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn login_then_check_returns_user() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = authority_with(internal);

        let token = authority.login("alice", "pw1", 60).await.unwrap().unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            authority.check(&token).await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn failed_login_returns_none_and_stores_nothing() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = authority_with(internal);

        assert_eq!(authority.login("alice", "nope", 60).await.unwrap(), None);
        assert_eq!(authority.login("bob", "pw1", 60).await.unwrap(), None);
        assert!(authority.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn check_unknown_token_is_none() {
        let authority = authority_with(Arc::new(FakeVerifier::new("internal", &[])));
        assert_eq!(authority.check("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_session_never_expires() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = authority_with(internal);

        let token = authority.login("alice", "pw1", 0).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(10 * 365 * 24 * 60 * 60)).await;
        assert_eq!(
            authority.check(&token).await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn limited_session_expires_and_is_evicted() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = authority_with(internal);

        let token = authority.login("alice", "pw1", 60).await.unwrap().unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(
            authority.check(&token).await.unwrap().as_deref(),
            Some("alice")
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(authority.check(&token).await.unwrap(), None);
        assert!(authority.sessions.lock().await.is_empty());

        // Already evicted.
        assert_eq!(authority.check(&token).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn session_expires_exactly_at_deadline() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = authority_with(internal);

        let token = authority.login("alice", "pw1", 10).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(authority.check(&token).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn check_waiting_on_the_table_sees_the_deadline_pass() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = Arc::new(authority_with(internal));

        let token = authority.login("alice", "pw1", 10).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(9)).await;

        let guard = authority.sessions.lock().await;
        let pending = tokio::spawn({
            let authority = authority.clone();
            let token = token.clone();
            async move { authority.check(&token).await }
        });
        // Let the check queue up on the lock before time moves on.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        drop(guard);

        assert_eq!(pending.await.unwrap().unwrap(), None);
        assert!(authority.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn logout_revokes_every_session_of_the_user() {
        let internal = Arc::new(FakeVerifier::new(
            "internal",
            &[("alice", "pw1"), ("bob", "pw2")],
        ));
        let authority = authority_with(internal);

        let first = authority.login("alice", "pw1", 0).await.unwrap().unwrap();
        let second = authority.login("alice", "pw1", 60).await.unwrap().unwrap();
        let other = authority.login("bob", "pw2", 0).await.unwrap().unwrap();

        authority.logout(&second).await.unwrap();

        assert_eq!(authority.check(&first).await.unwrap(), None);
        assert_eq!(authority.check(&second).await.unwrap(), None);
        assert_eq!(
            authority.check(&other).await.unwrap().as_deref(),
            Some("bob")
        );
    }

    #[tokio::test]
    async fn logout_unknown_token_is_a_noop() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = authority_with(internal);
        let token = authority.login("alice", "pw1", 0).await.unwrap().unwrap();

        authority.logout("unknown").await.unwrap();
        assert_eq!(
            authority.check(&token).await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_logins_get_distinct_tokens() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = Arc::new(authority_with(internal));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let authority = authority.clone();
                tokio::spawn(async move { authority.login("alice", "pw1", 0).await })
            })
            .collect();

        let mut tokens = HashSet::new();
        for handle in handles {
            tokens.insert(handle.await.unwrap().unwrap().unwrap());
        }
        assert_eq!(tokens.len(), 16);

        for token in &tokens {
            assert_eq!(
                authority.check(token).await.unwrap().as_deref(),
                Some("alice")
            );
        }
    }

    #[tokio::test]
    async fn totp_code_is_stripped_before_backend() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(StaticSecretSource::new(SecretString::from(
                    SECRET.to_string(),
                )))),
        )
        .unwrap();

        let password = format!("pw1{}", current_code());
        assert!(authority.authorize("alice", &password).await.unwrap());
        assert_eq!(internal.last_password().as_deref(), Some("pw1"));
    }

    #[tokio::test]
    async fn wrong_totp_code_never_reaches_backend() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(StaticSecretSource::new(SecretString::from(
                    SECRET.to_string(),
                )))),
        )
        .unwrap();

        let password = format!("pw1{}", wrong_code());
        assert!(!authority.authorize("alice", &password).await.unwrap());
        assert_eq!(authority.login("alice", &password, 0).await.unwrap(), None);
        assert_eq!(internal.calls(), 0);
    }

    #[tokio::test]
    async fn valid_totp_code_with_wrong_password_is_denied_by_backend() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(StaticSecretSource::new(SecretString::from(
                    SECRET.to_string(),
                )))),
        )
        .unwrap();

        let password = format!("wrong{}", current_code());
        assert!(!authority.authorize("alice", &password).await.unwrap());
        assert_eq!(internal.calls(), 1);
    }

    #[tokio::test]
    async fn short_password_with_totp_flows_through_same_path() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(StaticSecretSource::new(SecretString::from(
                    SECRET.to_string(),
                )))),
        )
        .unwrap();

        // Too short to hold a code: fails the second factor.
        assert!(!authority.authorize("alice", "abc").await.unwrap());
        assert_eq!(internal.calls(), 0);

        // Only a code: the backend sees an empty password.
        assert!(authority.authorize("alice", &current_code()).await.unwrap());
        assert_eq!(internal.last_password().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn empty_secret_passes_full_password() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1123456")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(StaticSecretSource::new(
                    SecretString::default(),
                ))),
        )
        .unwrap();

        assert!(authority.authorize("alice", "pw1123456").await.unwrap());
        assert_eq!(internal.last_password().as_deref(), Some("pw1123456"));
    }

    #[tokio::test]
    async fn blank_secret_leaves_totp_off() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(StaticSecretSource::new(
                    SecretString::from(" \n\t".to_string()),
                ))),
        )
        .unwrap();

        assert!(authority.authorize("alice", "pw1").await.unwrap());
        assert_eq!(internal.last_password().as_deref(), Some("pw1"));
    }

    #[tokio::test]
    async fn padded_secret_is_trimmed_before_use() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(StaticSecretSource::new(
                    SecretString::from(format!("  {SECRET}\n")),
                ))),
        )
        .unwrap();

        let password = format!("pw1{}", current_code());
        assert!(authority.authorize("alice", &password).await.unwrap());
        assert_eq!(internal.last_password().as_deref(), Some("pw1"));
    }

    #[tokio::test]
    async fn forced_internal_users_bypass_external_backend() {
        let internal = Arc::new(FakeVerifier::new("internal", &[("admin", "local")]));
        let external = Arc::new(FakeVerifier::new("external", &[("alice", "remote")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_external(external.clone())
                .with_force_internal_users(["admin"]),
        )
        .unwrap();

        assert!(authority.authorize("admin", "local").await.unwrap());
        assert_eq!(internal.calls(), 1);
        assert_eq!(external.calls(), 0);

        assert!(authority.authorize("alice", "remote").await.unwrap());
        assert_eq!(internal.calls(), 1);
        assert_eq!(external.calls(), 1);
    }

    #[tokio::test]
    async fn backend_failure_is_propagated_not_denied() {
        let internal = Arc::new(FakeVerifier::new("internal", &[]).failing_verify());
        let authority = authority_with(internal);

        let result = authority.login("alice", "pw1", 0).await;
        assert!(matches!(
            result,
            Err(AuthError::Backend { ref name, .. }) if name == "internal"
        ));
        assert!(authority.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn totp_source_failure_is_propagated() {
        struct BrokenSource;

        impl TotpSecretSource for BrokenSource {
            fn read_secret(&self) -> BoxFuture<'_, Result<SecretString>> {
                Box::pin(async { Err(anyhow!("permission denied")) })
            }
        }

        let internal = Arc::new(FakeVerifier::new("internal", &[("alice", "pw1")]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_totp_secret_source(Arc::new(BrokenSource)),
        )
        .unwrap();

        assert!(matches!(
            authority.authorize("alice", "pw1").await,
            Err(AuthError::TotpSecret(_))
        ));
        assert_eq!(internal.calls(), 0);
    }

    #[tokio::test]
    async fn cleanup_attempts_both_backends_and_aggregates() {
        let internal = Arc::new(FakeVerifier::new("internal", &[]).failing_cleanup());
        let external = Arc::new(FakeVerifier::new("external", &[]).failing_cleanup());
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal.clone())
                .with_external(external.clone()),
        )
        .unwrap();

        let result = authority.cleanup().await;
        let Err(AuthError::Cleanup(failures)) = result else {
            panic!("expected cleanup failure");
        };
        assert_eq!(failures.len(), 2);
        assert_eq!(internal.cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(external.cleanups.load(Ordering::SeqCst), 1);

        // Terminal: a second call does nothing.
        assert!(authority.cleanup().await.is_ok());
        assert_eq!(internal.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cleanup_runs_external_after_internal_failure() {
        let internal = Arc::new(FakeVerifier::new("internal", &[]).failing_cleanup());
        let external = Arc::new(FakeVerifier::new("external", &[]));
        let authority = SessionAuthority::new(
            AuthorityConfig::new(true)
                .with_internal(internal)
                .with_external(external.clone()),
        )
        .unwrap();

        let result = authority.cleanup().await;
        assert!(matches!(result, Err(AuthError::Cleanup(ref f)) if f.len() == 1));
        assert_eq!(external.cleanups.load(Ordering::SeqCst), 1);
    }
}
