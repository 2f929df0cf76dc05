use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Map an authority error onto a status code. Anything that isn't the
/// caller's fault is logged and reported as 500.
pub(crate) fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::InvalidUser(_) | AuthError::InvalidSession(_) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        AuthError::Disabled => error_response(StatusCode::CONFLICT, &err.to_string()),
        _ => {
            error!("Authorization failed: {}", error_chain(err));
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
