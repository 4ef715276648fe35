//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind, OrderError};
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request: unparseable ids, bodies or query strings.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        metrics::counter!("http_errors_total", "code" => code).increment(1);
        if status.is_server_error() {
            tracing::error!(error = %message, code, "request failed");
        }

        let body = ErrorBody {
            error: message,
            code,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, &'static str, String) {
    let status = match err.kind() {
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error_code(&err), err.to_string())
}

/// Stable message key for a domain error.
fn error_code(err: &DomainError) -> &'static str {
    match err {
        DomainError::OrderNotFound(_) | DomainError::OrdersNotFound(_) => "order_not_found",
        DomainError::ItemNotFound(_)
        | DomainError::ItemsNotFound(_)
        | DomainError::Order(OrderError::PriceMissing { .. }) => "item_not_found",
        DomainError::UserNotFound(_) => "resource_not_found",
        _ => match err.kind() {
            ErrorKind::BadInput => "validation_error",
            ErrorKind::NotFound => "resource_not_found",
            ErrorKind::Conflict => "concurrency_error",
            ErrorKind::Unavailable => "service_unavailable",
            ErrorKind::Internal => "server_error",
        },
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use common::{ItemId, OrderId, UserId, Version};
    use domain::{CatalogError, StoreError};

    use super::*;

    fn status_and_code(err: DomainError) -> (StatusCode, &'static str) {
        let (status, code, _) = domain_error_to_response(err);
        (status, code)
    }

    #[test]
    fn test_not_found_codes() {
        assert_eq!(
            status_and_code(DomainError::OrderNotFound(OrderId::new())),
            (StatusCode::NOT_FOUND, "order_not_found")
        );
        assert_eq!(
            status_and_code(DomainError::ItemsNotFound(vec![ItemId::new(3)])),
            (StatusCode::NOT_FOUND, "item_not_found")
        );
        assert_eq!(
            status_and_code(DomainError::UserNotFound(UserId::new())),
            (StatusCode::NOT_FOUND, "resource_not_found")
        );
    }

    #[test]
    fn test_bad_input_and_conflict_codes() {
        assert_eq!(
            status_and_code(OrderError::NoItems.into()),
            (StatusCode::BAD_REQUEST, "validation_error")
        );
        assert_eq!(
            status_and_code(CatalogError::InvalidName.into()),
            (StatusCode::BAD_REQUEST, "validation_error")
        );
        assert_eq!(
            status_and_code(DomainError::StaleVersion {
                order_id: OrderId::new(),
                expected: Version::first(),
                actual: Version::new(2),
            }),
            (StatusCode::CONFLICT, "concurrency_error")
        );
    }

    #[test]
    fn test_unavailable_and_internal_codes() {
        assert_eq!(
            status_and_code(DomainError::UserDirectoryUnavailable("timeout".into())),
            (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
        );
        assert_eq!(
            status_and_code(StoreError::backend("connection reset").into()),
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        );
    }
}
