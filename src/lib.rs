//! # Warden (session and authorization authority)
//!
//! `warden` gates access to an HTTP control surface. It decides per request
//! whether authorization is required, verifies credentials against one of two
//! pluggable backends (optionally behind a TOTP second factor) and issues,
//! validates and revokes opaque bearer tokens.
//!
//! ## Backends
//!
//! Every backend implements [`auth::CredentialVerifier`]. The *internal*
//! backend is mandatory when authorization is enabled; an *external* backend
//! may take over verification for everyone except the users forced onto the
//! internal one. Backends are built by name through [`auth::BackendRegistry`].
//!
//! ## Second factor
//!
//! When a TOTP secret is configured the last six characters of the password
//! are the one-time code. A wrong code denies access without ever reaching a
//! backend.
//!
//! ## Sessions
//!
//! Sessions live in memory only and vanish on restart. `logout` revokes every
//! session of the user that owns the presented token.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
