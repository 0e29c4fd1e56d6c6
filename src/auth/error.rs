// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::ErrorResponse;
use crate::validation::field_error;

/// Authentication and authorization error types
///
/// Token failures keep distinct variants for logging, but every one of
/// them renders the same client message.
#[derive(Debug, Error)]
pub enum AuthError {
    // Input errors
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("email already registered")]
    EmailAlreadyExists,

    // Authentication errors
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing authentication token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token has expired")]
    ExpiredToken,
    /// A well-formed session token whose subject no longer exists
    #[error("token subject not found")]
    UserNotFound,
    /// Recovery token absent, mismatched, expired or already consumed
    #[error("recovery token invalid or expired")]
    TokenInvalidOrExpired,

    // Authorization errors
    /// Authenticated, but not the owner of the target resource
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    // Internal errors
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("token generation error: {0}")]
    TokenGeneration(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::EmailAlreadyExists
            | AuthError::TokenInvalidOrExpired => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::NotFound { .. } => StatusCode::NOT_FOUND,
            AuthError::PasswordHash(_) | AuthError::TokenGeneration(_) | AuthError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Build the client-facing body. Safe to send: no secrets, no internals.
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            AuthError::Validation(errors) => ErrorResponse::validation(errors),
            AuthError::EmailAlreadyExists => ErrorResponse::validation(&field_error(
                "email",
                "email_taken",
                "Este email já está cadastrado",
            )),
            AuthError::InvalidCredentials => {
                ErrorResponse::new("INVALID_CREDENTIALS", "Email ou senha inválidos")
            }
            AuthError::MissingToken => ErrorResponse::new(
                "UNAUTHORIZED",
                "As credenciais de autenticação não foram fornecidas",
            ),
            AuthError::InvalidToken | AuthError::ExpiredToken => {
                ErrorResponse::new("INVALID_TOKEN", "Token inválido ou expirado")
            }
            AuthError::UserNotFound => ErrorResponse::new("USER_NOT_FOUND", "Usuário não encontrado"),
            AuthError::TokenInvalidOrExpired => {
                ErrorResponse::new("RECOVERY_TOKEN_INVALID", "Token inválido ou expirado")
            }
            AuthError::Forbidden(message) => ErrorResponse::new("FORBIDDEN", *message),
            AuthError::NotFound { resource, .. } => {
                ErrorResponse::new("NOT_FOUND", format!("{} não encontrado", resource))
            }
            AuthError::PasswordHash(_) | AuthError::TokenGeneration(_) | AuthError::Database(_) => {
                ErrorResponse::internal()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::InvalidToken => warn!("Invalid token attempt"),
            AuthError::ExpiredToken => warn!("Expired token attempt"),
            AuthError::MissingToken => warn!("Missing token in request"),
            AuthError::UserNotFound => warn!("Token subject no longer exists"),
            AuthError::Forbidden(reason) => warn!(reason = *reason, "Ownership check failed"),
            AuthError::PasswordHash(msg) => error!("Password hashing error: {}", msg),
            AuthError::TokenGeneration(msg) => error!("Token generation error: {}", msg),
            AuthError::Database(e) => error!("Database error in auth: {:?}", e),
            _ => {}
        }

        (self.status_code(), Json(self.to_error_response())).into_response()
    }
}
