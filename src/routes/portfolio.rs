/**
 * Portfolio Routes
 * Completed installation projects, filterable by category
 */
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::db::models::{
    NewPortfolioProject, PortfolioProject, ProjectCategory, UpdatePortfolioProject,
};
use crate::error::ApiError;
use crate::routes::extract::{ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;

/// Query parameters for GET /api/portfolio
#[derive(Debug, Deserialize)]
pub struct PortfolioQuery {
    pub category: Option<String>,
}

/// `None` means no filter: the parameter is absent, empty or `all`.
fn parse_category(raw: Option<&str>) -> Result<Option<ProjectCategory>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: crate::db::models::UnknownCategory| ApiError::BadRequest(e.to_string())),
    }
}

/// GET /api/portfolio?category=residential|commercial|energy|all
pub async fn list_published(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PortfolioQuery>,
) -> Result<Json<Vec<PortfolioProject>>, ApiError> {
    let projects = match parse_category(query.category.as_deref())? {
        Some(category) => {
            state
                .storage
                .list_portfolio_projects_by_category(category)
                .await?
        }
        None => state.storage.list_published_portfolio_projects().await?,
    };
    Ok(Json(projects))
}

/// GET /api/admin/portfolio - drafts included
pub async fn list_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<PortfolioProject>>, ApiError> {
    Ok(Json(state.storage.list_portfolio_projects().await?))
}

/// POST /api/admin/portfolio
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewPortfolioProject>,
) -> Result<(StatusCode, Json<PortfolioProject>), ApiError> {
    let project = state.storage.create_portfolio_project(&input).await?;
    tracing::info!(id = project.id, category = project.category.as_str(), "portfolio project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/admin/portfolio/{id}
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(input): ValidatedJson<UpdatePortfolioProject>,
) -> Result<Json<PortfolioProject>, ApiError> {
    Ok(Json(state.storage.update_portfolio_project(id, &input).await?))
}

/// DELETE /api/admin/portfolio/{id}
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_portfolio_project(id).await?;
    tracing::info!(id, "portfolio project deleted");
    Ok(StatusCode::NO_CONTENT)
}
