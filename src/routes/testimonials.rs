/**
 * Testimonial Routes
 * Customer reviews; only published ones are public
 */
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::db::models::{NewTestimonial, Testimonial, UpdateTestimonial};
use crate::error::ApiError;
use crate::routes::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

/// GET /api/testimonials
pub async fn list_published(
    State(state): State<AppState>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.storage.list_published_testimonials().await?))
}

/// GET /api/admin/testimonials
pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.storage.list_testimonials().await?))
}

/// POST /api/admin/testimonials
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewTestimonial>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    let testimonial = state.storage.create_testimonial(&input).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

/// PUT /api/admin/testimonials/{id}
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(input): ValidatedJson<UpdateTestimonial>,
) -> Result<Json<Testimonial>, ApiError> {
    Ok(Json(state.storage.update_testimonial(id, &input).await?))
}

/// DELETE /api/admin/testimonials/{id}
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_testimonial(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
