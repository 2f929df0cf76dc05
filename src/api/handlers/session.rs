//! Login, logout and session check endpoints.

use crate::api::{
    credentials::{self, clear_session_cookie, session_cookie},
    error::{auth_error_response, error_response, ErrorResponse},
    middleware::AuthenticatedUser,
    state::ApiState,
};
use axum::{
    extract::{Extension, FromRequest, Request},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub user: String,
    pub passwd: String,
    /// Session lifetime in seconds, 0 for a session that never expires.
    /// Defaults to the server setting.
    #[serde(default)]
    pub expire: Option<u64>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct LoginResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CheckResponse {
    pub user: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened, token also set as cookie", body = LoginResponse),
        (status = 400, description = "Malformed request or invalid user name", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 500, description = "Auth backend failure", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(Extension(state): Extension<Arc<ApiState>>, request: Request) -> Response {
    let authority = state.authority();
    if !authority.is_auth_enabled() {
        return Json(LoginResponse::default()).into_response();
    }

    let form = match read_login_request(request).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let user = form.user.trim();
    if !credentials::valid_user(user) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid user");
    }
    let expire = form.expire.unwrap_or(state.default_expire_seconds());

    match authority.login(user, &form.passwd, expire).await {
        Ok(Some(token)) => {
            let mut headers = HeaderMap::new();
            match session_cookie(&token, expire) {
                Ok(cookie) => {
                    headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => error!("Failed to build session cookie: {err}"),
            }
            (
                StatusCode::OK,
                headers,
                Json(LoginResponse { token: Some(token) }),
            )
                .into_response()
        }
        Ok(None) => error_response(StatusCode::FORBIDDEN, "Forbidden"),
        Err(err) => auth_error_response(&err),
    }
}

/// Login accepts both JSON bodies and HTML form posts.
async fn read_login_request(request: Request) -> Result<LoginRequest, Response> {
    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        Form::<LoginRequest>::from_request(request, &())
            .await
            .map(|Form(form)| form)
            .map_err(IntoResponse::into_response)
    } else {
        Json::<LoginRequest>::from_request(request, &())
            .await
            .map(|Json(form)| form)
            .map_err(IntoResponse::into_response)
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Every session of the user revoked, cookie cleared"),
        (status = 401, description = "Missing credentials", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    Extension(state): Extension<Arc<ApiState>>,
    user: Option<Extension<AuthenticatedUser>>,
    headers: HeaderMap,
) -> Response {
    let authority = state.authority();
    if authority.is_auth_enabled() {
        if let Some(token) = credentials::extract_session_token(&headers) {
            if let Err(err) = authority.logout(&token).await {
                return auth_error_response(&err);
            }
        } else if let Some(Extension(AuthenticatedUser(user))) = user {
            info!("Logout by user {user:?} without a session token, nothing to revoke");
        }
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_session_cookie());
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[utoipa::path(
    get,
    path = "/auth/check",
    responses(
        (status = 200, description = "Credentials are valid", body = CheckResponse),
        (status = 401, description = "Missing credentials", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn check(user: Option<Extension<AuthenticatedUser>>) -> Json<CheckResponse> {
    Json(CheckResponse {
        user: user.map(|Extension(AuthenticatedUser(user))| user),
    })
}
