//! Bundled credential backends.
//!
//! - `htpasswd`: local file of `user:hash` lines, the usual internal backend.
//! - `http`: delegates the decision to a remote endpoint, the usual external backend.

pub mod htpasswd;
pub mod http;

pub use htpasswd::HtpasswdVerifier;
pub use http::HttpVerifier;
