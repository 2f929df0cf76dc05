//! HTTP surface: login/logout/check endpoints and the authorization gate for
//! protected routes.

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod credentials;
mod error;
pub mod handlers;
pub mod middleware;
mod openapi;
mod state;

pub use error::ErrorResponse;
pub use middleware::{require_auth, AuthenticatedUser};
pub use openapi::openapi;
pub use state::ApiState;

/// Build the application router.
///
/// `/auth/logout` and `/auth/check` sit behind [`require_auth`]; `/health`,
/// `/auth/login` and `/openapi.json` are always reachable.
pub fn router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(handlers::session::logout))
        .route("/auth/check", get(handlers::session::check))
        .route_layer(axum::middleware::from_fn(require_auth));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/openapi.json", get(openapi::openapi_json))
        .route("/auth/login", post(handlers::session::login))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Serve until `shutdown` resolves.
///
/// # Errors
/// Return error if the server fails
pub async fn serve<F>(listener: TcpListener, state: Arc<ApiState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
