//! Credential extraction from request headers, plus the session cookie.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64, Encoding};
use regex::Regex;

pub const SESSION_COOKIE_NAME: &str = "auth_token";
pub const USER_HEADER: &str = "x-warden-user";
pub const PASSWD_HEADER: &str = "x-warden-passwd";

/// What a request presented to prove who it is.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { user: String, passwd: String },
    Token(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { user, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .field("passwd", &"***")
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
        }
    }
}

/// Pick credentials from the request, first match wins:
/// `X-Warden-User`/`X-Warden-Passwd`, bearer token, session cookie, basic auth.
#[must_use]
pub fn extract(headers: &HeaderMap) -> Option<Credentials> {
    if let Some(user) = header_str(headers, USER_HEADER) {
        let passwd = header_str(headers, PASSWD_HEADER).unwrap_or_default();
        return Some(Credentials::Password {
            user: user.to_string(),
            passwd: passwd.to_string(),
        });
    }

    if let Some(token) = extract_session_token(headers) {
        return Some(Credentials::Token(token));
    }

    extract_basic(headers).map(|(user, passwd)| Credentials::Password { user, passwd })
}

/// Session token from `Authorization: Bearer` or the session cookie.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == SESSION_COOKIE_NAME)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = header_str(headers, AUTHORIZATION.as_str())?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = header_str(headers, AUTHORIZATION.as_str())?.trim();
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))?
        .trim();
    let decoded = Base64::decode_vec(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, passwd) = decoded.split_once(':')?;
    Some((user.to_string(), passwd.to_string()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Account names: a letter or underscore, then letters, digits, `_`, `.`, `@` or `-`.
#[must_use]
pub fn valid_user(user: &str) -> bool {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.@-]{0,63}$").is_ok_and(|regex| regex.is_match(user))
}

/// `HttpOnly` cookie carrying the session token. `Max-Age` is only set for
/// expiring sessions.
///
/// # Errors
/// Returns an error if the token is not a valid header value.
pub fn session_cookie(token: &str, expire_seconds: u64) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    if expire_seconds > 0 {
        cookie.push_str(&format!("; Max-Age={expire_seconds}"));
    }
    HeaderValue::from_str(&cookie)
}

#[must_use]
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("auth_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
