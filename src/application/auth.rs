//! Back-office authentication.
//!
//! Admins log in with a username and password (argon2 PHC hashes) and receive
//! an HS256 session token. A static legacy token may also be configured; it
//! authenticates as an owner without a database account.

use std::{sync::Arc, time::Duration};

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        repos::{AdminsRepo, CreateAdminParams, RepoError},
        validate::{ensure_email, ensure_non_empty},
    },
    config::AuthSettings,
    domain::{entities::AdminRecord, error::DomainError, types::AdminRole},
};

const MIN_PASSWORD_LEN: usize = 8;
const LEGACY_PRINCIPAL: &str = "admin-token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingCredentials,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("session token is invalid or expired")]
    InvalidToken,
    #[error("this account is not allowed to perform the action")]
    Forbidden,
    #[error("session signing is not configured")]
    NotConfigured,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("username `{0}` is already taken")]
    DuplicateUsername(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: AdminRole,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller of an admin route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub id: Uuid,
    pub username: String,
    pub role: AdminRole,
}

impl AdminPrincipal {
    pub fn can_manage_settings(&self) -> bool {
        self.role == AdminRole::Owner
    }

    pub fn require_settings_access(&self) -> Result<(), AuthError> {
        if self.can_manage_settings() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Admin account as exposed over the API; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: AdminRole,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
}

impl From<&AdminRecord> for AdminProfile {
    fn from(record: &AdminRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            email: record.email.clone(),
            role: record.role,
            last_login_at: record.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub admin: AdminProfile,
}

#[derive(Debug, Clone)]
pub struct CreateAdminCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: AdminRole,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub admin_token: Option<String>,
    pub session_ttl: Duration,
}

impl From<&AuthSettings> for AuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            jwt_secret: settings.jwt_secret.clone(),
            admin_token: settings.admin_token.clone(),
            session_ttl: settings.session_ttl,
        }
    }
}

#[derive(Clone)]
pub struct AdminAuthService {
    repo: Arc<dyn AdminsRepo>,
    config: Arc<AuthConfig>,
}

impl AdminAuthService {
    pub fn new(repo: Arc<dyn AdminsRepo>, config: AuthConfig) -> Self {
        Self {
            repo,
            config: Arc::new(config),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.config.session_ttl
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let secret = self.signing_secret()?;

        let Some(mut admin) = self.repo.find_admin_by_username(username.trim()).await? else {
            warn!(
                target = "shopfront::application::auth",
                username = username.trim(),
                "login for unknown admin"
            );
            return Err(AuthError::InvalidCredentials);
        };
        if !admin.is_active || !verify_password(&admin.password_hash, password)? {
            warn!(
                target = "shopfront::application::auth",
                admin_id = %admin.id,
                active = admin.is_active,
                "admin login rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.config.session_ttl;
        let claims = Claims {
            sub: admin.id,
            username: admin.username.clone(),
            role: admin.role,
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = issue_token(&claims, secret)?;

        self.repo.touch_last_login(admin.id, now).await?;
        admin.last_login_at = Some(now);
        info!(
            target = "shopfront::application::auth",
            admin_id = %admin.id,
            role = admin.role.as_str(),
            "admin logged in"
        );

        Ok(LoginOutcome {
            token,
            expires_at,
            admin: AdminProfile::from(&admin),
        })
    }

    /// Accepts the legacy static token or a session token whose admin still
    /// exists and is active. The role is taken from the stored account.
    pub async fn authenticate(&self, token: &str) -> Result<AdminPrincipal, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if self.matches_legacy_token(token) {
            return Ok(AdminPrincipal {
                id: Uuid::nil(),
                username: LEGACY_PRINCIPAL.to_string(),
                role: AdminRole::Owner,
            });
        }

        let secret = self
            .config
            .jwt_secret
            .as_deref()
            .ok_or(AuthError::InvalidToken)?;
        let claims = verify_token(token, secret)?;

        match self.repo.find_admin(claims.sub).await? {
            Some(admin) if admin.is_active => Ok(AdminPrincipal {
                id: admin.id,
                username: admin.username,
                role: admin.role,
            }),
            _ => Err(AuthError::InvalidToken),
        }
    }

    pub async fn profile(&self, principal: &AdminPrincipal) -> Result<AdminProfile, AuthError> {
        if principal.id.is_nil() {
            return Ok(AdminProfile {
                id: principal.id,
                username: principal.username.clone(),
                email: String::new(),
                role: principal.role,
                last_login_at: None,
            });
        }
        let admin = self
            .repo
            .find_admin(principal.id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(AdminProfile::from(&admin))
    }

    pub async fn create_admin(
        &self,
        command: CreateAdminCommand,
    ) -> Result<AdminProfile, AuthError> {
        ensure_non_empty(&command.username, "username")?;
        ensure_email(&command.email, "email")?;
        let password_hash = hash_password(&command.password)?;

        let username = command.username.trim().to_string();
        let admin = self
            .repo
            .create_admin(CreateAdminParams {
                username: username.clone(),
                email: command.email.trim().to_string(),
                password_hash,
                role: command.role,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AuthError::DuplicateUsername(username),
                other => AuthError::Repo(other),
            })?;
        info!(
            target = "shopfront::application::auth",
            admin_id = %admin.id,
            role = admin.role.as_str(),
            "admin account created"
        );
        Ok(AdminProfile::from(&admin))
    }

    fn signing_secret(&self) -> Result<&str, AuthError> {
        self.config
            .jwt_secret
            .as_deref()
            .ok_or(AuthError::NotConfigured)
    }

    fn matches_legacy_token(&self, candidate: &str) -> bool {
        self.config
            .admin_token
            .as_deref()
            .is_some_and(|expected| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())))
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .into());
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|err| AuthError::Hash(err.to_string()))?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AuthError::Hash(err.to_string())),
    }
}

pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::NotConfigured)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}
