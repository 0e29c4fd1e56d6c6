// Error handling module for the storefront API
// Provides the shared error body and the catalogue-facing error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::auth::AuthError;

/// Main error type for the product endpoints
///
/// Authentication failures raised by the bearer extractor or the
/// authorization guard are carried through unchanged in `Auth`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation errors from request validation
    /// Maps to HTTP 400 Bad Request
    #[error("request validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Malformed query string parameters
    /// Maps to HTTP 400 Bad Request
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Resource not found by ID
    /// Maps to HTTP 404 Not Found
    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    /// Database operation errors
    /// Maps to HTTP 500, details are kept out of the response
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Consistent error response structure
///
/// Every error leaving the service, products or users, is rendered with
/// this shape.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    #[schema(example = "VALIDATION_ERROR")]
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level details, omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Build a 400 body from field-level validation errors
    pub fn validation(errors: &validator::ValidationErrors) -> Self {
        Self {
            details: Some(serde_json::to_value(errors).unwrap_or_else(|_| serde_json::json!({}))),
            ..Self::new("VALIDATION_ERROR", "Dados inválidos")
        }
    }

    /// Generic body for 500-level failures
    pub fn internal() -> Self {
        Self::new("INTERNAL_ERROR", "Erro interno do servidor")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (StatusCode::BAD_REQUEST, ErrorResponse::validation(&errors))
            }
            ApiError::InvalidQuery(message) => {
                debug!("Invalid query parameters: {}", message);
                (StatusCode::BAD_REQUEST, ErrorResponse::new("INVALID_QUERY", message))
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} não encontrado", resource)),
                )
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::internal())
            }
            ApiError::Auth(auth_error) => return auth_error.into_response(),
        };

        (status, Json(body)).into_response()
    }
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(auth_error) => auth_error.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::field_error;

    #[test]
    fn test_status_codes() {
        let validation = ApiError::ValidationError(field_error("preco", "price", "x"));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        let missing = ApiError::NotFound { resource: "Produto", id: 7 };
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        let auth = ApiError::from(AuthError::MissingToken);
        assert_eq!(auth.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_validation_body_carries_field_details() {
        let errors = field_error("preco", "price_must_be_positive", "O valor não pode ser menor ou igual a zero.");
        let body = serde_json::to_value(ErrorResponse::validation(&errors)).unwrap();
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert!(body["details"].get("preco").is_some());
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_details_omitted_when_absent() {
        let body = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "Produto não encontrado")).unwrap();
        assert!(body.get("details").is_none());
    }
}
