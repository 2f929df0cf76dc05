//! Session token generation.

use super::error::AuthError;
use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};

const TOKEN_BYTES: usize = 32;
const MAX_TOKEN_ATTEMPTS: usize = 10;

/// Create a new random session token: 32 bytes from the OS RNG, hex encoded.
pub(super) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(hex::encode(bytes))
}

/// Draw tokens until one is not `taken`.
///
/// Running out of attempts means the random source is broken.
pub(super) fn unique_token(
    taken: impl Fn(&str) -> bool,
    mut generate: impl FnMut() -> Result<String>,
) -> Result<String, AuthError> {
    for _ in 0..MAX_TOKEN_ATTEMPTS {
        let token = generate().map_err(AuthError::Entropy)?;
        if !taken(&token) {
            return Ok(token);
        }
    }
    Err(AuthError::TokenExhausted)
}
