// Application configuration loaded from the environment

use std::str::FromStr;

use thiserror::Error;

use crate::auth::password::PasswordPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Upper bounds for the lifetimes read from the environment
pub const MAX_ACCESS_TTL_MINUTES: i64 = 60 * 24;
pub const MAX_REFRESH_TTL_MINUTES: i64 = 60 * 24 * 365;
pub const MAX_RECOVERY_TTL_MINUTES: i64 = 60 * 24;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub token_ttl_minutes: i64,
    /// Base URL of the web client that hosts the reset page
    pub frontend_url: String,
    /// Debug only: echo the recovery token in the forgot-password response
    pub expose_token: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub recovery: RecoveryConfig,
    pub registration_policy: PasswordPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any name -> value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "PORT", 8080)?,
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                access_ttl_minutes: minutes_or(&lookup, "JWT_ACCESS_TTL_MINUTES", 15, MAX_ACCESS_TTL_MINUTES)?,
                refresh_ttl_minutes: minutes_or(
                    &lookup,
                    "JWT_REFRESH_TTL_MINUTES",
                    60 * 24 * 7,
                    MAX_REFRESH_TTL_MINUTES,
                )?,
            },
            recovery: RecoveryConfig {
                token_ttl_minutes: minutes_or(
                    &lookup,
                    "RECOVERY_TOKEN_TTL_MINUTES",
                    60,
                    MAX_RECOVERY_TTL_MINUTES,
                )?,
                frontend_url: lookup("FRONTEND_URL")
                    .unwrap_or_else(|| "http://localhost:3000".into()),
                expose_token: parse_or(&lookup, "EXPOSE_RECOVERY_TOKEN", false)?,
            },
            registration_policy: parse_or(
                &lookup,
                "REGISTRATION_PASSWORD_POLICY",
                PasswordPolicy::Standard,
            )?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// A lifetime in minutes within `1..=max`
fn minutes_or<F>(lookup: &F, name: &'static str, default: i64, max: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, name, default)?;
    if !(1..=max).contains(&value) {
        return Err(ConfigError::Invalid { name, value: value.to_string() });
    }
    Ok(value)
}
