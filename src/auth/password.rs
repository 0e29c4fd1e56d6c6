// Password hashing and validation service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::error;
use validator::ValidationError;

use crate::auth::error::AuthError;
use crate::validation::invalid;

/// Special characters accepted (and, for the strong policy, required)
pub const SPECIAL_CHARACTERS: &str = "@$!%*?&";

/// Which rule set a new password must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicy {
    /// 8..=50 characters, not only digits, at least one uppercase letter
    Standard,
    /// At least 8 characters with upper, lower, digit and one of
    /// `@$!%*?&`, nothing outside `[A-Za-z0-9@$!%*?&]`
    Strong,
}

impl PasswordPolicy {
    /// Check a plaintext password against this policy, reporting the first
    /// rule it breaks
    pub fn check(self, password: &str) -> Result<(), ValidationError> {
        let length = password.chars().count();
        if length < 8 {
            return Err(invalid("password_too_short", "Senha deve ter no mínimo 8 caracteres"));
        }
        match self {
            PasswordPolicy::Standard => {
                if length > 50 {
                    return Err(invalid("password_too_long", "Senha deve ter no máximo 50 caracteres"));
                }
                if password.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("password_numeric", "Senha não pode ser apenas números"));
                }
                if !password.chars().any(char::is_uppercase) {
                    return Err(invalid(
                        "password_no_uppercase",
                        "Senha deve conter pelo menos uma letra maiúscula",
                    ));
                }
            }
            PasswordPolicy::Strong => {
                if !password.chars().any(|c| c.is_ascii_uppercase()) {
                    return Err(invalid(
                        "password_no_uppercase",
                        "Senha deve conter pelo menos uma letra maiúscula",
                    ));
                }
                if !password.chars().any(|c| c.is_ascii_lowercase()) {
                    return Err(invalid(
                        "password_no_lowercase",
                        "Senha deve conter pelo menos uma letra minúscula",
                    ));
                }
                if !password.chars().any(|c| c.is_ascii_digit()) {
                    return Err(invalid("password_no_digit", "Senha deve conter pelo menos um número"));
                }
                if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
                    return Err(invalid(
                        "password_no_special",
                        "Senha deve conter pelo menos um caractere especial (@$!%*?&)",
                    ));
                }
                if !password
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || SPECIAL_CHARACTERS.contains(c))
                {
                    return Err(invalid(
                        "password_invalid_characters",
                        "Senha contém caracteres não permitidos",
                    ));
                }
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for PasswordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(PasswordPolicy::Standard),
            "strong" => Ok(PasswordPolicy::Strong),
            other => Err(format!("unknown password policy '{}'", other)),
        }
    }
}

/// Password service for hashing and verification
///
/// Hashes are Argon2id PHC strings; verification reads the parameters back
/// out of the stored hash, so services built with different parameters can
/// verify each other's hashes.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl Default for PasswordService {
    fn default() -> Self {
        Self { argon2: Argon2::default() }
    }
}

impl PasswordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service with explicit Argon2id cost parameters
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a password using Argon2id with a fresh random salt
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AuthError::PasswordHash(e.to_string())
            })
    }

    /// Verify a password against a stored hash.
    /// Malformed hash data verifies as `false` rather than erroring.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_password_service() -> PasswordService {
    PasswordService::with_params(Params::new(1024, 1, 1, None).expect("valid argon2 params"))
}
