/**
 * Local credential authentication
 * Username/password login against bcrypt hashes in `admin_users`
 */
use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::session::{self, SESSION_COOKIE};
use crate::config::{AdminSeed, AdminSeedPassword};
use crate::db::models::{AdminUser, NewAdminUser, SessionIdentity};
use crate::error::ApiError;
use crate::routes::extract::ValidatedJson;
use crate::state::AppState;
use crate::storage::{Storage, StorageError};

pub const BCRYPT_COST: u32 = 12;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash_password(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .context("password hashing task failed")?
        .context("bcrypt hash failed")
}

/// Compare a password with a stored hash on the blocking pool. A malformed
/// stored hash counts as a mismatch.
async fn verify_password(password: String, password_hash: String) -> Result<bool, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .context("password verification task failed")?;
    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be checked");
            Ok(false)
        }
    }
}

/// Resolve an active admin account for the given credentials.
pub async fn authenticate(
    storage: &dyn Storage,
    username: &str,
    password: &str,
) -> Result<AdminUser, ApiError> {
    let user = match storage.get_admin_user_by_username(username).await? {
        Some(user) if user.is_active => user,
        Some(_) => {
            tracing::warn!(username, "login attempt on inactive account");
            return Err(ApiError::Unauthorized);
        }
        None => {
            tracing::warn!(username, "login attempt for unknown account");
            return Err(ApiError::Unauthorized);
        }
    };

    if !verify_password(password.to_string(), user.password_hash.clone()).await? {
        tracing::warn!(username, "failed login attempt");
        return Err(ApiError::Unauthorized);
    }

    Ok(user)
}

/// Create an active admin account, hashing the password first.
pub async fn create_admin(
    storage: &dyn Storage,
    username: &str,
    password: &str,
    email: Option<String>,
) -> anyhow::Result<AdminUser> {
    let password_hash = hash_password(password.to_string()).await?;
    create_admin_with_hash(storage, username, password_hash, email).await
}

async fn create_admin_with_hash(
    storage: &dyn Storage,
    username: &str,
    password_hash: String,
    email: Option<String>,
) -> anyhow::Result<AdminUser> {
    let user = storage
        .create_admin_user(&NewAdminUser {
            username: username.to_string(),
            password_hash,
            email,
            is_active: true,
        })
        .await
        .map_err(|e| match e {
            StorageError::Conflict(_) => anyhow::anyhow!("admin user {username:?} already exists"),
            other => anyhow::Error::new(other).context("could not create admin user"),
        })?;
    Ok(user)
}

/// Create the configured admin account unless that username already exists.
pub async fn seed_admin(storage: &dyn Storage, seed: &AdminSeed) -> anyhow::Result<()> {
    if storage
        .get_admin_user_by_username(&seed.username)
        .await?
        .is_some()
    {
        tracing::debug!(username = %seed.username, "admin account already present");
        return Ok(());
    }

    let password_hash = match &seed.password {
        AdminSeedPassword::Hash(hash) => hash.clone(),
        AdminSeedPassword::Plain(plain) => hash_password(plain.clone()).await?,
    };
    create_admin_with_hash(storage, &seed.username, password_hash, seed.email.clone()).await?;
    tracing::info!(username = %seed.username, "seeded admin account");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionIdentity>), ApiError> {
    let storage = state.storage.as_ref();
    let user = authenticate(storage, &payload.username, &payload.password).await?;

    storage.update_admin_user_last_login(user.id).await?;
    let purged = storage.delete_expired_sessions().await?;
    if purged > 0 {
        tracing::debug!(purged, "removed expired sessions");
    }

    let identity = SessionIdentity::Admin {
        id: user.id,
        username: user.username,
        email: user.email,
    };
    let token = session::start_session(storage, identity.clone(), state.config.session_ttl).await?;
    let cookie = session::auth_cookie(
        SESSION_COOKIE,
        token,
        state.config.session_ttl,
        state.config.secure_cookies,
    );

    tracing::info!(username = %payload.username, "admin logged in");
    Ok((jar.add(cookie), Json(identity)))
}

/// POST /api/admin/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    session::end_session(state.storage.as_ref(), &jar).await?;
    Ok((jar.remove(session::removal_cookie(SESSION_COOKIE)), StatusCode::NO_CONTENT))
}
