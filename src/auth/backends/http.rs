//! Remote HTTP backend.
//!
//! POSTs `{"user", "passwd", "secret"}` as JSON to the configured URL. A 2xx
//! answer authorizes the user, any other status denies. Transport failures
//! (refused connection, timeout, TLS) are errors, not denials.

use crate::{
    auth::{
        registry::BackendOptions,
        verifier::{BoxFuture, CredentialVerifier},
    },
    APP_USER_AGENT,
};
use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::{fmt, sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

pub const PLUGIN_NAME: &str = "http";

const DEFAULT_TIMEOUT_SECONDS: u64 = 5;
const USER_HEADER: &str = "X-Warden-User";

/// Factory registered under [`PLUGIN_NAME`].
///
/// Options: `url` (required), `user` and `passwd` for HTTP basic auth against
/// the endpoint, `secret` forwarded in the body, `timeout` in seconds
/// (default 5) and `verify` to toggle TLS certificate checks (default true).
///
/// # Errors
/// Returns an error if an option is missing or malformed, or the HTTP client
/// can't be built.
pub fn factory(options: &BackendOptions) -> Result<Arc<dyn CredentialVerifier>> {
    let url = Url::parse(options.required("url")?).context("invalid url option")?;
    let timeout = Duration::from_secs(options.get_u64("timeout", DEFAULT_TIMEOUT_SECONDS)?);
    let verify_tls = options.get_bool("verify", true)?;

    let basic_auth = options
        .get("user")
        .filter(|user| !user.is_empty())
        .map(|user| {
            (
                user.to_string(),
                SecretString::from(options.get("passwd").unwrap_or_default().to_string()),
            )
        });
    let secret = SecretString::from(options.get("secret").unwrap_or_default().to_string());

    Ok(Arc::new(HttpVerifier::new(
        url, timeout, verify_tls, basic_auth, secret,
    )?))
}

pub struct HttpVerifier {
    client: Client,
    url: Url,
    basic_auth: Option<(String, SecretString)>,
    secret: SecretString,
}

impl HttpVerifier {
    /// # Errors
    /// Returns an error if the HTTP client can't be built.
    pub fn new(
        url: Url,
        timeout: Duration,
        verify_tls: bool,
        basic_auth: Option<(String, SecretString)>,
        secret: SecretString,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            basic_auth,
            secret,
        })
    }
}

impl fmt::Debug for HttpVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpVerifier")
            .field("url", &self.url.as_str())
            .field(
                "basic_auth",
                &self.basic_auth.as_ref().map(|(user, _)| user.as_str()),
            )
            .field("secret", &"***")
            .finish()
    }
}

impl CredentialVerifier for HttpVerifier {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn verify<'a>(&'a self, user: &'a str, password: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let body = json!({
                "user": user,
                "passwd": password,
                "secret": self.secret.expose_secret(),
            });

            let mut request = self
                .client
                .post(self.url.clone())
                .header(USER_HEADER, user)
                .json(&body);
            if let Some((name, passwd)) = &self.basic_auth {
                request = request.basic_auth(name, Some(passwd.expose_secret()));
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("request to {} failed", self.url))?;

            let status = response.status();
            if status.is_success() {
                Ok(true)
            } else {
                debug!("{} answered {status} for user {user:?}", self.url);
                Ok(false)
            }
        })
    }
}
