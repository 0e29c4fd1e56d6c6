// JWT token generation and validation service

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::error::AuthError;
use crate::config::JwtConfig;

/// Distinguishes short-lived access tokens from refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub kind: TokenKind,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

/// An access/refresh pair minted together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token service for JWT operations
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_token_duration: i64,  // in seconds
    refresh_token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a TokenService with explicit lifetimes in seconds
    pub fn new(secret: &str, access_token_duration: i64, refresh_token_duration: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_token_duration,
            refresh_token_duration,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(
            &config.secret,
            config.access_ttl_minutes.saturating_mul(60),
            config.refresh_ttl_minutes.saturating_mul(60),
        )
    }

    fn sign(&self, user_id: i32, kind: TokenKind) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_token_duration,
            TokenKind::Refresh => self.refresh_token_duration,
        };

        let claims = Claims {
            sub: user_id,
            kind,
            iat: now,
            exp: now.saturating_add(ttl),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    /// Generate a short-lived access token
    pub fn generate_access_token(&self, user_id: i32) -> Result<String, AuthError> {
        self.sign(user_id, TokenKind::Access)
    }

    /// Generate a long-lived refresh token
    pub fn generate_refresh_token(&self, user_id: i32) -> Result<String, AuthError> {
        self.sign(user_id, TokenKind::Refresh)
    }

    /// Generate both access and refresh tokens
    pub fn generate_token_pair(&self, user_id: i32) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.generate_access_token(user_id)?,
            refresh: self.generate_refresh_token(user_id)?,
        })
    }

    /// Validate an access token; refresh tokens are rejected
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_kind(token, TokenKind::Access)
    }

    /// Validate a refresh token; access tokens are rejected
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_kind(token, TokenKind::Refresh)
    }

    fn validate_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.kind != expected {
            debug!(user_id = claims.sub, kind = ?claims.kind, expected = ?expected, "jwt kind mismatch");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Signature and expiry check shared by both token kinds
    fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Helper to create a test token service: 15 minutes / 7 days
    fn test_token_service() -> TokenService {
        TokenService::new("test_secret_key_for_testing_purposes", 900, 604800)
    }

    fn expired_token(kind: TokenKind) -> String {
        let claims = Claims {
            sub: 1,
            kind,
            iat: Utc::now().timestamp() - 1000,
            exp: Utc::now().timestamp() - 500,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test_secret_key_for_testing_purposes".as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_lifetime() {
        let service = test_token_service();
        let token = service.generate_access_token(1).unwrap();
        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn test_refresh_token_lifetime() {
        let service = test_token_service();
        let token = service.generate_refresh_token(1).unwrap();
        let claims = service.validate_refresh_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 604800);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_generate_token_pair() {
        let service = test_token_service();
        let pair = service.generate_token_pair(7).unwrap();

        assert_eq!(service.validate_access_token(&pair.access).unwrap().sub, 7);
        assert_eq!(service.validate_refresh_token(&pair.refresh).unwrap().sub, 7);
        assert_ne!(pair.access, pair.refresh);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let service = test_token_service();
        let pair = service.generate_token_pair(1).unwrap();

        assert!(matches!(
            service.validate_refresh_token(&pair.access),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service.validate_access_token(&pair.refresh),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_tokens_are_rejected() {
        let service = test_token_service();
        assert!(matches!(
            service.validate_access_token(&expired_token(TokenKind::Access)),
            Err(AuthError::ExpiredToken)
        ));
        assert!(matches!(
            service.validate_refresh_token(&expired_token(TokenKind::Refresh)),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let service = test_token_service();

        assert!(service.validate_access_token("").is_err());
        assert!(service.validate_access_token("not.a.token").is_err());
        assert!(service.validate_access_token("invalid_token_format").is_err());
        assert!(service
            .validate_access_token("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature")
            .is_err());
    }

    #[test]
    fn test_token_signature_verification() {
        let service1 = TokenService::new("secret1", 900, 604800);
        let service2 = TokenService::new("secret2", 900, 604800);

        let token = service1.generate_access_token(1).unwrap();

        assert!(service1.validate_access_token(&token).is_ok());
        assert!(matches!(
            service2.validate_access_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_from_config_uses_minutes() {
        let config = JwtConfig {
            secret: "cfg-secret".to_string(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        };
        let service = TokenService::from_config(&config);
        let pair = service.generate_token_pair(3).unwrap();
        let access = service.validate_access_token(&pair.access).unwrap();
        let refresh = service.validate_refresh_token(&pair.refresh).unwrap();
        assert_eq!(access.exp - access.iat, 300);
        assert_eq!(refresh.exp - refresh.iat, 3600);
    }

    #[test]
    fn test_oversized_lifetimes_saturate() {
        let config = JwtConfig {
            secret: "cfg-secret".to_string(),
            access_ttl_minutes: i64::MAX,
            refresh_ttl_minutes: i64::MAX / 2,
        };
        let service = TokenService::from_config(&config);
        let pair = service.generate_token_pair(3).unwrap();
        let access = service.validate_access_token(&pair.access).unwrap();
        assert_eq!(access.exp, i64::MAX);
    }

    proptest! {
        #[test]
        fn prop_token_claims_contain_identity(user_id in 1i32..1000000) {
            let service = test_token_service();
            let pair = service.generate_token_pair(user_id)?;
            prop_assert_eq!(service.validate_access_token(&pair.access)?.sub, user_id);
            prop_assert_eq!(service.validate_refresh_token(&pair.refresh)?.sub, user_id);
        }

        #[test]
        fn prop_malformed_tokens_rejected(malformed in "[a-zA-Z0-9]{10,50}") {
            let service = test_token_service();
            prop_assert!(service.validate_access_token(&malformed).is_err());
            prop_assert!(service.validate_refresh_token(&malformed).is_err());
        }
    }
}
