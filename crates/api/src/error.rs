//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart_store::StoreError;
use domain::{CartError, DomainError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Caller is missing or lacks the required role.
    Unauthorized(String),
    /// Request failed validation.
    Validation(String),
    /// Cart engine error.
    Domain(DomainError),
}

impl ApiError {
    /// Status code and stable kind for this error.
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError"),
            ApiError::Domain(err) => domain_status(err),
        }
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::Cart(cart_err) => {
            let status = match cart_err {
                CartError::ProductNotFound { .. }
                | CartError::CartNotFound { .. }
                | CartError::ProductNotInCart { .. } => StatusCode::NOT_FOUND,
                CartError::EmptyStock { .. } | CartError::LowStock { .. } => StatusCode::CONFLICT,
                CartError::EmptyCart { .. } => StatusCode::BAD_REQUEST,
            };
            (status, cart_err.kind())
        }
        DomainError::Store(StoreError::OpenCartConflict { .. }) => {
            (StatusCode::CONFLICT, "OpenCartConflict")
        }
        DomainError::Store(store_err) if store_err.is_unavailable() => {
            (StatusCode::SERVICE_UNAVAILABLE, "StorageUnavailable")
        }
        DomainError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match self {
            ApiError::Unauthorized(msg) | ApiError::Validation(msg) => msg,
            ApiError::Domain(err) => {
                if status.is_server_error() {
                    tracing::error!(error = %err, kind, "storage failure");
                }
                err.to_string()
            }
        };

        metrics::counter!("http_errors_total", "kind" => kind).increment(1);

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
