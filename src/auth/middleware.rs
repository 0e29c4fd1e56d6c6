// Bearer-token extractor for protected routes

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::User, service::AuthService};

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            warn!("Authorization header without a bearer token");
            AuthError::InvalidToken
        })?;
    Ok(token)
}

/// The caller's resolved identity.
///
/// Rejects with 401 when the header is missing or malformed, the access token
/// is invalid or expired, or the user it names no longer exists.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let service = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        let user = service.resolve_identity(token).await?;

        debug!(user_id = user.id, path = %parts.uri.path(), "request authenticated");
        Ok(AuthenticatedUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::RegisterRequest;
    use crate::testing::test_auth_service;
    use axum::http::Request;

    // Helper to create test parts with Authorization header
    fn create_parts_with_auth(auth_value: &str) -> Parts {
        let req = Request::builder()
            .uri("/usuarios/perfil")
            .header(header::AUTHORIZATION, auth_value)
            .body(())
            .unwrap();

        let (parts, _) = req.into_parts();
        parts
    }

    // Helper to create test parts without Authorization header
    fn create_parts_without_auth() -> Parts {
        let req = Request::builder().uri("/usuarios/perfil").body(()).unwrap();
        let (parts, _) = req.into_parts();
        parts
    }

    async fn service_with_user() -> (Arc<AuthService>, User) {
        let (service, _) = test_auth_service();
        let user = service
            .register(RegisterRequest {
                name: "Ana Silva".to_string(),
                email: "ana@x.com".to_string(),
                phone: None,
                password: "Abcdef1!".to_string(),
                password_confirmation: "Abcdef1!".to_string(),
            })
            .await
            .unwrap();
        (service, user)
    }

    #[test]
    fn test_bearer_token_parsing() {
        let parts = create_parts_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts.headers).unwrap(), "abc.def.ghi");

        let parts = create_parts_with_auth("Basic dXNlcjpwYXNz");
        assert!(matches!(bearer_token(&parts.headers), Err(AuthError::InvalidToken)));

        let parts = create_parts_with_auth("Bearer ");
        assert!(matches!(bearer_token(&parts.headers), Err(AuthError::InvalidToken)));

        let parts = create_parts_without_auth();
        assert!(matches!(bearer_token(&parts.headers), Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_valid_access_token_resolves_user() {
        let (service, user) = service_with_user().await;
        let pair = service.issue(&user).unwrap();

        let mut parts = create_parts_with_auth(&format!("Bearer {}", pair.access));
        let AuthenticatedUser(resolved) =
            AuthenticatedUser::from_request_parts(&mut parts, &service).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.email, "ana@x.com");
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_bearer_token() {
        let (service, user) = service_with_user().await;
        let pair = service.issue(&user).unwrap();

        let mut parts = create_parts_with_auth(&format!("Bearer {}", pair.refresh));
        let result = AuthenticatedUser::from_request_parts(&mut parts, &service).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let (service, _) = service_with_user().await;
        let mut parts = create_parts_without_auth();
        let result = AuthenticatedUser::from_request_parts(&mut parts, &service).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_deleted_user_token_is_rejected() {
        let (service, user) = service_with_user().await;
        let pair = service.issue(&user).unwrap();
        service.delete_user(&user, user.id).await.unwrap();

        let mut parts = create_parts_with_auth(&format!("Bearer {}", pair.access));
        let result = AuthenticatedUser::from_request_parts(&mut parts, &service).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }
}
