/**
 * Contact Routes
 * Public inquiry form and the admin inbox
 */
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{ContactSubmission, NewContactSubmission};
use crate::error::ApiError;
use crate::routes::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub message: String,
    pub id: i32,
}

/// POST /api/contact
pub async fn submit(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewContactSubmission>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    let submission = state.storage.create_contact_submission(&input).await?;
    tracing::info!(
        id = submission.id,
        service = submission.service_needed.as_deref().unwrap_or("unspecified"),
        "contact form submitted"
    );
    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Thank you! We will be in touch shortly.".to_string(),
            id: submission.id,
        }),
    ))
}

/// GET /api/admin/contact-submissions - newest first
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    Ok(Json(state.storage.list_contact_submissions().await?))
}

/// PUT /api/admin/contact-submissions/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.set_contact_submission_read(id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/contact-submissions/{id}/unread
pub async fn mark_unread(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.set_contact_submission_read(id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}
