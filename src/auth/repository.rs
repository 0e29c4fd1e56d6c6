// Credential store: the user persistence seam and its Postgres implementation

use axum::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::debug;

use crate::auth::{
    error::AuthError,
    models::{NewUser, User, UserChanges},
};

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, recovery_token_hash, recovery_expires_at, created_at, updated_at";

/// Hash a recovery token using SHA-256; only the digest is ever stored
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Persistence operations the auth service needs.
///
/// Emails are passed in already normalised. Implementations must enforce
/// email uniqueness themselves and report a clash as
/// `AuthError::EmailAlreadyExists`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, AuthError>;

    /// All users ordered by name
    async fn list(&self) -> Result<Vec<User>, AuthError>;

    async fn create(&self, user: NewUser) -> Result<User, AuthError>;

    /// Apply `changes` and bump `updated_at`. Setting a new password hash
    /// also discards any outstanding recovery token.
    async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>, AuthError>;

    /// Returns whether a row was deleted
    async fn delete(&self, id: i32) -> Result<bool, AuthError>;

    /// Store (or clear, with `None`) the recovery token digest and its expiry
    async fn set_recovery_token(
        &self,
        id: i32,
        token: Option<(String, DateTime<Utc>)>,
    ) -> Result<(), AuthError>;

    /// Atomically check the recovery digest and expiry, set the new password
    /// hash and clear the token. `None` when the token did not match.
    async fn consume_recovery_token(
        &self,
        id: i32,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AuthError>;
}

fn map_unique_violation(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AuthError::EmailAlreadyExists;
        }
    }
    AuthError::Database(e)
}

/// User repository for database operations
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let sql = format!("SELECT {} FROM users WHERE email = LOWER($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AuthError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let sql = format!("SELECT {} FROM users ORDER BY name, id", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User, AuthError> {
        let sql = format!(
            "INSERT INTO users (name, email, phone, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        debug!(user_id = user.id, "user row inserted");
        Ok(user)
    }

    async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>, AuthError> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = CASE WHEN $4 THEN $5 ELSE phone END,
                password_hash = COALESCE($6, password_hash),
                recovery_token_hash = CASE WHEN $6::text IS NULL THEN recovery_token_hash ELSE NULL END,
                recovery_expires_at = CASE WHEN $6::text IS NULL THEN recovery_expires_at ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let (phone_changed, phone) = match changes.phone {
            Some(phone) => (true, phone),
            None => (false, None),
        };

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(phone_changed)
            .bind(phone)
            .bind(changes.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        Ok(user)
    }

    async fn delete(&self, id: i32) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_recovery_token(
        &self,
        id: i32,
        token: Option<(String, DateTime<Utc>)>,
    ) -> Result<(), AuthError> {
        let (token_hash, expires_at) = match token {
            Some((hash, expires_at)) => (Some(hash), Some(expires_at)),
            None => (None, None),
        };

        sqlx::query(
            "UPDATE users SET recovery_token_hash = $2, recovery_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_recovery_token(
        &self,
        id: i32,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AuthError> {
        let sql = format!(
            r#"
            UPDATE users
            SET password_hash = $3,
                recovery_token_hash = NULL,
                recovery_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND recovery_token_hash = $2
              AND recovery_expires_at > NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(token_hash)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
