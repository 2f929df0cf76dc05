//! Session authority, credential verification and backend plumbing.
//!
//! Flow Overview:
//! - `is_auth_required` decides whether a route needs credentials at all.
//! - `authorize` checks the optional TOTP code, picks the internal or external
//!   backend and delegates the password check.
//! - `login` turns a successful `authorize` into an opaque session token,
//!   `check` resolves a token back to its user and `logout` revokes every
//!   session of that user.
//!
//! Security boundaries: denials are reported to callers as a bare `false` or
//! `None`; the reason (second factor vs. backend) only reaches the logs.

mod authority;
pub mod backends;
mod config;
mod error;
mod registry;
mod session;
mod token;
pub mod totp;
mod verifier;

pub use authority::SessionAuthority;
pub use config::AuthorityConfig;
pub use error::AuthError;
pub use registry::{BackendFactory, BackendOptions, BackendRegistry};
pub use session::Session;
pub use totp::{FileSecretSource, StaticSecretSource, TotpSecretSource};
pub use verifier::{BoxFuture, CredentialVerifier};
