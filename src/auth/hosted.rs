/**
 * Hosted identity authentication
 * OpenID Connect authorization-code flow against an external provider
 */
use anyhow::Context;
use axum::{
    extract::State,
    response::Redirect,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::session::{self, SESSION_COOKIE};
use crate::config::{AuthMode, OidcConfig};
use crate::db::models::{SessionIdentity, UpsertUser, User};
use crate::error::ApiError;
use crate::routes::extract::ApiQuery;
use crate::state::AppState;

pub const STATE_COOKIE: &str = "oidc_state";
const STATE_TTL_MINUTES: i64 = 10;

/// Claims read from the provider's ID token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl From<IdTokenClaims> for UpsertUser {
    fn from(claims: IdTokenClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            first_name: claims.given_name,
            last_name: claims.family_name,
            profile_image_url: claims.picture,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
}

fn oidc_config(state: &AppState) -> Result<&OidcConfig, ApiError> {
    match &state.config.auth {
        AuthMode::Hosted(oidc) => Ok(oidc),
        AuthMode::Local => Err(ApiError::Internal(anyhow::anyhow!(
            "hosted login route reached in local auth mode"
        ))),
    }
}

pub fn authorization_url(oidc: &OidcConfig, state: &str) -> Url {
    let mut url = oidc.authorize_url.clone();
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &oidc.client_id)
        .append_pair("redirect_uri", &oidc.redirect_uri)
        .append_pair("scope", "openid email profile")
        .append_pair("state", state);
    url
}

/// Read the ID token claims, checking issuer, audience and expiry.
///
/// The token arrives directly from the token endpoint over TLS in exchange
/// for our client secret, so its signature is not re-verified here.
pub fn decode_id_token(
    id_token: &str,
    oidc: &OidcConfig,
) -> Result<IdTokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.set_audience(&[&oidc.client_id]);
    validation.set_issuer(&[&oidc.issuer]);

    let data =
        jsonwebtoken::decode::<IdTokenClaims>(id_token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

async fn exchange_code(state: &AppState, oidc: &OidcConfig, code: &str) -> anyhow::Result<String> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", oidc.redirect_uri.as_str()),
        ("client_id", oidc.client_id.as_str()),
        ("client_secret", oidc.client_secret.as_str()),
    ];

    let response = state
        .http
        .post(oidc.token_url.clone())
        .form(&params)
        .send()
        .await
        .context("token endpoint unreachable")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("token endpoint returned {status}: {body}");
    }

    let tokens: TokenResponse = response
        .json()
        .await
        .context("token response was not valid JSON")?;
    Ok(tokens.id_token)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let oidc = oidc_config(&state)?;
    let login_state = Alphanumeric.sample_string(&mut rand::rng(), 32);
    let target = authorization_url(oidc, &login_state);
    let cookie = session::auth_cookie(
        STATE_COOKIE,
        login_state,
        Duration::minutes(STATE_TTL_MINUTES),
        state.config.secure_cookies,
    );
    Ok((jar.add(cookie), Redirect::to(target.as_str())))
}

/// GET /api/callback
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let oidc = oidc_config(&state)?;

    if let Some(error) = query.error {
        tracing::warn!(error = %error, "identity provider returned an error");
        return Err(ApiError::Unauthorized);
    }

    let expected = jar.get(STATE_COOKIE).map(|cookie| cookie.value());
    match (expected, query.state.as_deref()) {
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received => {}
        _ => {
            tracing::warn!("login callback with missing or mismatched state");
            return Err(ApiError::BadRequest("Invalid login state".to_string()));
        }
    }
    let code = query
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let id_token = exchange_code(&state, oidc, &code).await?;
    let claims = decode_id_token(&id_token, oidc).map_err(|e| {
        tracing::warn!(error = %e, "rejected ID token");
        ApiError::Unauthorized
    })?;

    let user = state.storage.upsert_user(&claims.into()).await?;
    let identity = SessionIdentity::User {
        id: user.id.clone(),
        email: user.email.clone(),
    };
    let token =
        session::start_session(state.storage.as_ref(), identity, state.config.session_ttl).await?;

    tracing::info!(user_id = %user.id, "user logged in through identity provider");

    let cookie = session::auth_cookie(
        SESSION_COOKIE,
        token,
        state.config.session_ttl,
        state.config.secure_cookies,
    );
    let jar = jar
        .add(cookie)
        .remove(session::removal_cookie(STATE_COOKIE));
    Ok((jar, Redirect::to("/")))
}

/// GET /api/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let oidc = oidc_config(&state)?;
    session::end_session(state.storage.as_ref(), &jar).await?;

    let target = match &oidc.end_session_url {
        Some(url) => {
            let mut url = url.clone();
            url.query_pairs_mut().append_pair("client_id", &oidc.client_id);
            url.to_string()
        }
        None => "/".to_string(),
    };
    Ok((
        jar.remove(session::removal_cookie(SESSION_COOKIE)),
        Redirect::to(&target),
    ))
}

/// GET /api/auth/user
pub async fn auth_user(
    State(state): State<AppState>,
    Extension(identity): Extension<SessionIdentity>,
) -> Result<Json<User>, ApiError> {
    let SessionIdentity::User { id, .. } = identity else {
        return Err(ApiError::Unauthorized);
    };
    let user = state
        .storage
        .get_user(&id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user))
}
