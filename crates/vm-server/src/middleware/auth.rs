//! API key authentication.
//!
//! When `auth.enabled` is set, every `/api` request must carry
//! `Authorization: Bearer <auth.api_key>`. With auth disabled, requests pass
//! straight through.

use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use vm_core::config::AuthConfig;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Check a raw `Authorization` header value against the configured key.
pub fn is_authorized(auth: &AuthConfig, authorization: Option<&str>) -> bool {
    if !auth.enabled {
        return true;
    }
    let Some(expected) = auth.api_key.as_deref().filter(|k| !k.is_empty()) else {
        return false;
    };
    authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token.trim() == expected)
}

pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if is_authorized(&ctx.config.auth, authorization) {
        return Ok(next.run(request).await);
    }

    tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
    let mut err = AppError::new(vm_core::Error::Unauthorized(
        "Authentication required".into(),
    ));
    if let Some(RequestId(id)) = request.extensions().get::<RequestId>() {
        err = err.with_request_id(id.clone());
    }
    Err(err.into_response())
}
