// User data models and request/response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{format_phone, validate_email_address, validate_person_name, validate_phone};

/// User database model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    /// SHA-256 hex digest of the outstanding recovery token
    pub recovery_token_hash: Option<String>,
    pub recovery_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user; `password_hash` is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
}

/// Normalised profile changes; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` clears the phone
    pub phone: Option<Option<String>>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.password_hash.is_none()
    }
}

/// User response model (never carries the hash or recovery state)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[serde(rename = "nome")]
    #[schema(example = "Ana Silva")]
    pub name: String,
    #[schema(example = "ana@x.com")]
    pub email: String,
    #[serde(rename = "telefone")]
    #[schema(example = "(11) 98765-4321")]
    pub phone: Option<String>,
    #[serde(rename = "telefone_formatado")]
    pub formatted_phone: Option<String>,
    #[serde(rename = "criado")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            formatted_phone: user.phone.as_deref().map(format_phone),
            phone: user.phone,
            created_at: user.created_at,
        }
    }
}

/// Registration request DTO
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    #[serde(rename = "nome")]
    #[validate(custom = "validate_person_name")]
    #[schema(example = "Ana Silva")]
    pub name: String,
    #[validate(custom = "validate_email_address")]
    #[schema(example = "ana@x.com")]
    pub email: String,
    #[serde(rename = "telefone")]
    #[validate(custom = "validate_phone")]
    #[schema(example = "(11) 98765-4321")]
    pub phone: Option<String>,
    #[serde(rename = "senha")]
    #[schema(example = "Abcdef1!")]
    pub password: String,
    #[serde(rename = "senha_confirmacao")]
    #[schema(example = "Abcdef1!")]
    pub password_confirmation: String,
}

/// Login request DTO
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(custom = "validate_email_address")]
    pub email: String,
    #[serde(rename = "senha")]
    #[validate(length(min = 1, message = "Este campo é obrigatório"))]
    pub password: String,
}

/// Token refresh request DTO
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Partial profile update; every field is optional
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateUserRequest {
    #[serde(rename = "nome")]
    #[validate(custom = "validate_person_name")]
    pub name: Option<String>,
    #[validate(custom = "validate_email_address")]
    pub email: Option<String>,
    #[serde(rename = "telefone")]
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[serde(rename = "senha")]
    pub password: Option<String>,
    #[serde(rename = "senha_confirmacao")]
    pub password_confirmation: Option<String>,
}

/// Authenticated password change
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ChangePasswordRequest {
    #[serde(rename = "senha_atual")]
    #[validate(length(min = 1, message = "Este campo é obrigatório"))]
    pub current_password: String,
    #[serde(rename = "nova_senha")]
    pub new_password: String,
    #[serde(rename = "confirmar_senha")]
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    #[validate(custom = "validate_email_address")]
    pub email: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ValidateTokenRequest {
    #[validate(custom = "validate_email_address")]
    pub email: String,
    #[validate(length(min = 1, message = "Este campo é obrigatório"))]
    pub token: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ResetPasswordRequest {
    #[validate(custom = "validate_email_address")]
    pub email: String,
    #[validate(length(min = 1, message = "Este campo é obrigatório"))]
    pub token: String,
    #[serde(rename = "nova_senha")]
    pub new_password: String,
    #[serde(rename = "confirmar_senha")]
    pub confirm_password: String,
}

/// Login / password-reset response: the user plus a fresh session pair
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    #[serde(rename = "mensagem")]
    pub message: String,
    #[serde(rename = "usuario")]
    pub user: UserResponse,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[serde(rename = "mensagem")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserMessageResponse {
    #[serde(rename = "mensagem")]
    pub message: String,
    #[serde(rename = "usuario")]
    pub user: UserResponse,
}

/// Always the same message; `token` only appears when the debug echo is on
#[derive(Debug, Serialize, ToSchema)]
pub struct ForgotPasswordResponse {
    #[serde(rename = "mensagem")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenValidResponse {
    #[serde(rename = "mensagem")]
    pub message: String,
    pub email: String,
    #[serde(rename = "nome")]
    pub name: String,
}
