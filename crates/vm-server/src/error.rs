//! Error-to-HTTP response conversion.
//!
//! Wraps [`vm_core::Error`] so route handlers can return
//! `Result<T, AppError>` and use `?` on engine and catalog calls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: vm_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: vm_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    fn code(&self) -> &'static str {
        match &self.inner {
            vm_core::Error::NotFound { .. } => "not_found",
            vm_core::Error::Unauthorized(_) => "unauthorized",
            vm_core::Error::Validation(_) => "validation_error",
            vm_core::Error::Database { .. } => "database_error",
            vm_core::Error::Io { .. } => "io_error",
            vm_core::Error::Catalog(_) => "catalog_error",
            vm_core::Error::Cancelled => "cancelled",
            vm_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl From<vm_core::Error> for AppError {
    fn from(e: vm_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.code(),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
