//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CustomerError, OrderError};
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order workflow error.
    Order(OrderError),
    /// Customer profile error.
    Customer(CustomerError),
}

/// Failure body: `{ "success": false, "message": ..., "error": ... }`.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::Customer(err) => customer_error_to_response(err),
        };

        metrics::counter!("api_errors_total", "status" => status.as_str().to_string())
            .increment(1);
        if status.is_server_error() {
            tracing::error!(error = ?error, %message, "internal server error");
        }

        let body = ErrorBody {
            success: false,
            message,
            error,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String, Option<String>) {
    match &err {
        OrderError::InvalidRequest(_)
        | OrderError::InsufficientStock { .. }
        | OrderError::InvalidState { .. } => (StatusCode::BAD_REQUEST, err.to_string(), None),
        OrderError::CustomerNotFound
        | OrderError::ProductNotFound { .. }
        | OrderError::OrderNotFound => (StatusCode::NOT_FOUND, err.to_string(), None),
        OrderError::Store(store_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An unexpected error occurred while processing the order".to_string(),
            Some(store_err.to_string()),
        ),
    }
}

fn customer_error_to_response(err: CustomerError) -> (StatusCode, String, Option<String>) {
    match &err {
        CustomerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string(), None),
        CustomerError::NotFound => (StatusCode::NOT_FOUND, err.to_string(), None),
        CustomerError::Store(store_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An unexpected error occurred while processing the customer profile".to_string(),
            Some(store_err.to_string()),
        ),
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<CustomerError> for ApiError {
    fn from(err: CustomerError) -> Self {
        ApiError::Customer(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderStatus;
    use store::StoreError;

    #[test]
    fn test_order_errors_map_to_status_codes() {
        let cases = [
            (
                OrderError::InvalidRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                OrderError::InvalidState {
                    status: OrderStatus::Delivered,
                },
                StatusCode::BAD_REQUEST,
            ),
            (OrderError::CustomerNotFound, StatusCode::NOT_FOUND),
            (OrderError::OrderNotFound, StatusCode::NOT_FOUND),
            (
                OrderError::Store(StoreError::Unavailable("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_customer_not_found_is_404() {
        let response = ApiError::from(CustomerError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
