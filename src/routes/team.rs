/**
 * Team Routes
 * Staff profiles for the about page
 */
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::db::models::{NewTeamMember, TeamMember, UpdateTeamMember};
use crate::error::ApiError;
use crate::routes::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

/// GET /api/team
pub async fn list_active(State(state): State<AppState>) -> Result<Json<Vec<TeamMember>>, ApiError> {
    Ok(Json(state.storage.list_active_team_members().await?))
}

/// GET /api/admin/team
pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<TeamMember>>, ApiError> {
    Ok(Json(state.storage.list_team_members().await?))
}

/// POST /api/admin/team
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewTeamMember>,
) -> Result<(StatusCode, Json<TeamMember>), ApiError> {
    let member = state.storage.create_team_member(&input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// PUT /api/admin/team/{id}
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(input): ValidatedJson<UpdateTeamMember>,
) -> Result<Json<TeamMember>, ApiError> {
    Ok(Json(state.storage.update_team_member(id, &input).await?))
}

/// DELETE /api/admin/team/{id}
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_team_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
