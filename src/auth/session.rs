//! Server-side sessions keyed by an opaque cookie token.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use rand::distr::{Alphanumeric, SampleString};
use sha2::{Digest, Sha256};

use crate::db::models::{Session, SessionIdentity};
use crate::storage::{Storage, StorageResult};

pub const SESSION_COOKIE: &str = "sid";

pub fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 64)
}

/// SHA-256 of the cookie token, hex encoded. Only this value is stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// HttpOnly, SameSite=Lax cookie scoped to the whole site.
pub fn auth_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age.num_seconds().max(0)))
        .build()
}

/// Path must match `auth_cookie` for the browser to drop it.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

fn session_token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|token| !token.is_empty())
}

/// Persist a new session and return the raw token for the cookie.
pub async fn start_session(
    storage: &dyn Storage,
    identity: SessionIdentity,
    ttl: Duration,
) -> StorageResult<String> {
    let token = generate_token();
    storage
        .create_session(&Session {
            token_hash: hash_token(&token),
            identity,
            expires_at: Utc::now() + ttl,
        })
        .await?;
    Ok(token)
}

pub async fn load_session(
    storage: &dyn Storage,
    jar: &CookieJar,
) -> StorageResult<Option<Session>> {
    match session_token(jar) {
        Some(token) => storage.get_session(&hash_token(token)).await,
        None => Ok(None),
    }
}

/// Delete the session named by the request cookie, if any.
pub async fn end_session(storage: &dyn Storage, jar: &CookieJar) -> StorageResult<()> {
    if let Some(token) = session_token(jar) {
        storage.delete_session(&hash_token(token)).await?;
    }
    Ok(())
}
