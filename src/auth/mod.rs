//! Session authentication: local credentials or a hosted OpenID Connect
//! provider, both ending in a `SessionIdentity` stored server-side.

pub mod hosted;
pub mod local;
pub mod session;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::db::models::SessionIdentity;
use crate::error::ApiError;
use crate::state::AppState;

/// Admin guard. Rejects with 401 unless the request carries a live session,
/// then exposes the session's identity as a request extension.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(request.headers());
    let session = session::load_session(state.storage.as_ref(), &jar)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    tracing::debug!(identity = ?session.identity, "session accepted");
    request.extensions_mut().insert(session.identity);
    Ok(next.run(request).await)
}

/// GET /api/admin/user
pub async fn current_identity(
    Extension(identity): Extension<SessionIdentity>,
) -> Json<SessionIdentity> {
    Json(identity)
}
