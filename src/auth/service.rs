// Authentication service - business logic layer

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, error, info, warn};
use validator::{Validate, ValidationErrors};

use crate::auth::{
    error::AuthError,
    guard::{authorize, Operation},
    mailer::{RecoveryEmail, RecoveryMailer},
    models::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, NewUser, RegisterRequest,
        ResetPasswordRequest, UpdateUserRequest, User, UserChanges, ValidateTokenRequest,
    },
    password::{PasswordPolicy, PasswordService},
    repository::{hash_token, UserStore},
    token::{TokenPair, TokenService},
};
use crate::config::{AppConfig, MAX_RECOVERY_TTL_MINUTES};
use crate::validation::{field_error, invalid, normalize_email, normalize_phone};

const RECOVERY_TOKEN_LENGTH: usize = 48;

/// Verified against when a login names an unknown email, so both failure
/// paths pay for one argon2 verification
const DUMMY_PASSWORD: &str = "Dummy-Password-1!";

/// Policy knobs the service reads from configuration
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub registration_policy: PasswordPolicy,
    pub recovery_ttl_minutes: i64,
    pub frontend_url: String,
    pub expose_recovery_token: bool,
}

impl AuthSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            registration_policy: config.registration_policy,
            recovery_ttl_minutes: config.recovery.token_ttl_minutes,
            frontend_url: config.recovery.frontend_url.clone(),
            expose_recovery_token: config.recovery.expose_token,
        }
    }

    /// Recovery token lifetime clamped to `1..=MAX_RECOVERY_TTL_MINUTES`
    pub fn recovery_ttl_minutes(&self) -> i64 {
        self.recovery_ttl_minutes.clamp(1, MAX_RECOVERY_TTL_MINUTES)
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            registration_policy: PasswordPolicy::Standard,
            recovery_ttl_minutes: 60,
            frontend_url: "http://localhost:3000".to_string(),
            expose_recovery_token: false,
        }
    }
}

/// Authentication service coordinating all credential and session operations
pub struct AuthService {
    users: Arc<dyn UserStore>,
    passwords: PasswordService,
    tokens: TokenService,
    mailer: Arc<dyn RecoveryMailer>,
    settings: AuthSettings,
    dummy_hash: String,
}

fn errors_of(request: &impl Validate) -> ValidationErrors {
    request.validate().err().unwrap_or_else(ValidationErrors::new)
}

fn into_result(errors: ValidationErrors) -> Result<(), AuthError> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}

fn generate_recovery_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RECOVERY_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        passwords: PasswordService,
        tokens: TokenService,
        mailer: Arc<dyn RecoveryMailer>,
        settings: AuthSettings,
    ) -> Result<Self, AuthError> {
        let dummy_hash = passwords.hash_password(DUMMY_PASSWORD)?;
        Ok(Self {
            users,
            passwords,
            tokens,
            mailer,
            settings,
            dummy_hash,
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        let mut errors = errors_of(&request);
        if let Err(e) = self.settings.registration_policy.check(&request.password) {
            errors.add("senha", e);
        }
        if request.password != request.password_confirmation {
            errors.add(
                "senha_confirmacao",
                invalid("password_mismatch", "As senhas não coincidem"),
            );
        }
        into_result(errors)?;

        let email = normalize_email(&request.email);
        // concurrent registrations are settled by the unique constraint
        if self.users.exists_by_email(&email).await? {
            debug!(email = %email, "registration with taken email");
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = self.passwords.hash_password(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                name: request.name.trim().to_string(),
                email,
                phone: normalize_phone(request.phone),
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Check an email/password pair. Unknown email and wrong password fail
    /// identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        match self.users.find_by_email(&email).await? {
            Some(user) if self.passwords.verify_password(password, &user.password_hash) => Ok(user),
            Some(user) => {
                warn!(user_id = user.id, "failed login: wrong password");
                Err(AuthError::InvalidCredentials)
            }
            None => {
                self.passwords.verify_password(password, &self.dummy_hash);
                warn!(email = %email, "failed login: unknown email");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Mint an access/refresh pair for `user`
    pub fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        self.tokens.generate_token_pair(user.id)
    }

    /// Login a user
    pub async fn login(&self, request: LoginRequest) -> Result<(User, TokenPair), AuthError> {
        request.validate()?;
        let user = self.authenticate(&request.email, &request.password).await?;
        let tokens = self.issue(&user)?;
        info!(user_id = user.id, "user logged in");
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new access token. The refresh token
    /// itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AuthError> {
        let token = refresh_token.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
            AuthError::Validation(field_error(
                "refresh",
                "required",
                "Refresh Token é obrigatório",
            ))
        })?;

        let claims = self.tokens.validate_refresh_token(token)?;
        let user = self.users.find_by_id(claims.sub).await?.ok_or_else(|| {
            warn!(user_id = claims.sub, "refresh token for missing user");
            AuthError::UserNotFound
        })?;

        debug!(user_id = user.id, "access token refreshed");
        self.tokens.generate_access_token(user.id)
    }

    /// Map a bearer access token to the user it names
    pub async fn resolve_identity(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.validate_access_token(access_token)?;
        self.users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn get_user(&self, id: i32) -> Result<User, AuthError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(AuthError::NotFound { resource: "Usuário", id })
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        self.users.list().await
    }

    /// Partial profile update of `target_id` on behalf of `caller`
    pub async fn update_profile(
        &self,
        caller: &User,
        target_id: i32,
        request: UpdateUserRequest,
    ) -> Result<User, AuthError> {
        let target = self.get_user(target_id).await?;
        authorize(Operation::UpdateUser, Some(caller), Some(target.id))?;

        let mut errors = errors_of(&request);
        if let Some(password) = &request.password {
            if let Err(e) = self.settings.registration_policy.check(password) {
                errors.add("senha", e);
            } else if self.passwords.verify_password(password, &target.password_hash) {
                errors.add(
                    "senha",
                    invalid("password_unchanged", "Nova senha não pode ser igual a anterior"),
                );
            }
            if request.password_confirmation.as_deref() != Some(password.as_str()) {
                errors.add(
                    "senha_confirmacao",
                    invalid("password_mismatch", "As senhas não coincidem"),
                );
            }
        }
        into_result(errors)?;

        let mut changes = UserChanges {
            name: request.name.map(|n| n.trim().to_string()),
            phone: request.phone.map(|p| normalize_phone(Some(p))),
            ..UserChanges::default()
        };

        if let Some(email) = request.email {
            let email = normalize_email(&email);
            if email != target.email {
                if self.users.exists_by_email(&email).await? {
                    return Err(AuthError::EmailAlreadyExists);
                }
                changes.email = Some(email);
            }
        }

        if let Some(password) = request.password {
            changes.password_hash = Some(self.passwords.hash_password(&password)?);
        }

        if changes.is_empty() {
            return Ok(target);
        }

        let password_changed = changes.password_hash.is_some();
        let user = self
            .users
            .update(target.id, changes)
            .await?
            .ok_or(AuthError::NotFound { resource: "Usuário", id: target_id })?;

        info!(user_id = user.id, password_changed, "user profile updated");
        Ok(user)
    }

    /// Delete `target_id` on behalf of `caller`; returns the removed user
    pub async fn delete_user(&self, caller: &User, target_id: i32) -> Result<User, AuthError> {
        let target = self.get_user(target_id).await?;
        authorize(Operation::DeleteUser, Some(caller), Some(target.id))?;

        if !self.users.delete(target.id).await? {
            return Err(AuthError::NotFound { resource: "Usuário", id: target_id });
        }
        info!(user_id = target.id, "user deleted");
        Ok(target)
    }

    /// Authenticated password change
    pub async fn change_password(
        &self,
        caller: &User,
        target_id: i32,
        request: ChangePasswordRequest,
    ) -> Result<User, AuthError> {
        let target = self.get_user(target_id).await?;
        authorize(Operation::ChangePassword, Some(caller), Some(target.id))?;
        request.validate()?;

        if !self
            .passwords
            .verify_password(&request.current_password, &target.password_hash)
        {
            warn!(user_id = target.id, "password change with wrong current password");
            return Err(AuthError::Validation(field_error(
                "senha_atual",
                "wrong_password",
                "Senha atual incorreta",
            )));
        }
        if request.new_password != request.confirm_password {
            return Err(AuthError::Validation(field_error(
                "confirmar_senha",
                "password_mismatch",
                "As senhas não coincidem",
            )));
        }
        if self
            .passwords
            .verify_password(&request.new_password, &target.password_hash)
        {
            return Err(AuthError::Validation(field_error(
                "nova_senha",
                "password_unchanged",
                "Nova senha não pode ser igual à senha atual",
            )));
        }
        PasswordPolicy::Strong.check(&request.new_password).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add("nova_senha", e);
            AuthError::Validation(errors)
        })?;

        let changes = UserChanges {
            password_hash: Some(self.passwords.hash_password(&request.new_password)?),
            ..UserChanges::default()
        };
        let user = self
            .users
            .update(target.id, changes)
            .await?
            .ok_or(AuthError::NotFound { resource: "Usuário", id: target_id })?;

        info!(user_id = user.id, "password changed");
        Ok(user)
    }

    /// Start password recovery for `email`.
    ///
    /// Registered and unregistered addresses get the same outcome and the
    /// same request-path work: a token is generated and hashed either way,
    /// and storing it and mailing the link happen on a spawned task. The
    /// returned token is `Some` only when the debug echo is enabled and the
    /// address exists.
    pub async fn request_reset(
        &self,
        request: ForgotPasswordRequest,
    ) -> Result<Option<String>, AuthError> {
        request.validate()?;
        let email = normalize_email(&request.email);
        let user = self.users.find_by_email(&email).await?;
        let known = user.is_some();

        let token = generate_recovery_token();
        let token_hash = hash_token(&token);
        let ttl_minutes = self.settings.recovery_ttl_minutes();
        let expires_at = Utc::now() + Duration::minutes(ttl_minutes);

        let users = Arc::clone(&self.users);
        let mailer = Arc::clone(&self.mailer);
        let frontend_url = self.settings.frontend_url.clone();
        let link_token = token.clone();
        let delivery = tokio::spawn(async move {
            let Some(user) = user else {
                debug!(email = %email, "recovery requested for unknown email");
                return;
            };
            if let Err(e) = users
                .set_recovery_token(user.id, Some((token_hash, expires_at)))
                .await
            {
                error!(user_id = user.id, error = %e, "could not store recovery token");
                return;
            }
            info!(user_id = user.id, %expires_at, "recovery token issued");

            let message = match RecoveryEmail::new(
                &frontend_url,
                &user.email,
                &user.name,
                &link_token,
                ttl_minutes,
            ) {
                Ok(message) => message,
                Err(e) => {
                    error!(user_id = user.id, error = %e, "could not build recovery email");
                    return;
                }
            };
            if let Err(e) = mailer.send(&message) {
                error!(user_id = user.id, error = %e, "recovery email delivery failed");
            }
        });

        if !self.settings.expose_recovery_token {
            return Ok(None);
        }
        // an echoed token must already be stored when the response goes out
        if let Err(e) = delivery.await {
            error!(error = %e, "recovery task aborted");
        }
        Ok(known.then_some(token))
    }

    /// Whether `token` is the live recovery token stored for `user`
    fn recovery_token_matches(user: &User, token: &str) -> bool {
        match (&user.recovery_token_hash, user.recovery_expires_at) {
            (Some(stored), Some(expires_at)) => {
                expires_at > Utc::now() && *stored == hash_token(token)
            }
            _ => false,
        }
    }

    async fn user_for_recovery(&self, email: &str, token: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::TokenInvalidOrExpired)?;

        if !Self::recovery_token_matches(&user, token) {
            debug!(user_id = user.id, "recovery token rejected");
            return Err(AuthError::TokenInvalidOrExpired);
        }
        Ok(user)
    }

    /// Check a recovery token without consuming it
    pub async fn validate_recovery_token(
        &self,
        request: ValidateTokenRequest,
    ) -> Result<User, AuthError> {
        request.validate()?;
        self.user_for_recovery(&request.email, &request.token).await
    }

    /// Consume a recovery token, set the new password and open a session
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<(User, TokenPair), AuthError> {
        request.validate()?;
        let user = self.user_for_recovery(&request.email, &request.token).await?;

        if request.new_password != request.confirm_password {
            return Err(AuthError::Validation(field_error(
                "confirmar_senha",
                "password_mismatch",
                "As senhas não coincidem",
            )));
        }
        if self
            .passwords
            .verify_password(&request.new_password, &user.password_hash)
        {
            return Err(AuthError::Validation(field_error(
                "nova_senha",
                "password_unchanged",
                "Nova senha não pode ser igual à senha atual",
            )));
        }
        PasswordPolicy::Strong.check(&request.new_password).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add("nova_senha", e);
            AuthError::Validation(errors)
        })?;

        let password_hash = self.passwords.hash_password(&request.new_password)?;
        let user = self
            .users
            .consume_recovery_token(user.id, &hash_token(&request.token), &password_hash)
            .await?
            .ok_or(AuthError::TokenInvalidOrExpired)?;

        let tokens = self.issue(&user)?;
        info!(user_id = user.id, "password reset via recovery token");
        Ok((user, tokens))
    }
}
