use super::{
    credentials::{self, Credentials},
    error::{auth_error_response, error_response},
    state::ApiState,
};
use crate::auth::SessionAuthority;
use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// User resolved by [`require_auth`], available to handlers as an extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Gate for protected routes.
///
/// Passes through when the path doesn't require authorization. Otherwise:
/// 401 without credentials, 403 when they are rejected, 500 when a backend
/// or the TOTP secret fails.
pub async fn require_auth(
    Extension(state): Extension<Arc<ApiState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authority = state.authority();
    if !authority.is_auth_required(request.uri().path(), true) {
        return next.run(request).await;
    }

    let user = match resolve_user(authority, credentials::extract(request.headers())).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    request.extensions_mut().insert(AuthenticatedUser(user));
    next.run(request).await
}

async fn resolve_user(
    authority: &SessionAuthority,
    credentials: Option<Credentials>,
) -> Result<String, Response> {
    match credentials {
        None => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Missing credentials",
        )),

        Some(Credentials::Token(token)) => match authority.check(&token).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                debug!("Rejected unknown or expired session token");
                Err(error_response(StatusCode::FORBIDDEN, "Forbidden"))
            }
            Err(err) => Err(auth_error_response(&err)),
        },

        Some(Credentials::Password { user, passwd }) => {
            let user = user.trim();
            if !credentials::valid_user(user) {
                return Err(error_response(StatusCode::BAD_REQUEST, "Invalid user"));
            }
            match authority.authorize(user, &passwd).await {
                Ok(true) => Ok(user.to_string()),
                Ok(false) => Err(error_response(StatusCode::FORBIDDEN, "Forbidden")),
                Err(err) => Err(auth_error_response(&err)),
            }
        }
    }
}
