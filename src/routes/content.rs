/**
 * Company Content Routes
 * Editable site copy (hero, about, contact blurbs) keyed by section
 */
use axum::{
    extract::State,
    Json,
};

use crate::db::models::{CompanyContent, UpdateCompanyContent, UpsertCompanyContent};
use crate::error::ApiError;
use crate::routes::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

/// GET /api/company-content
pub async fn list_content(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyContent>>, ApiError> {
    Ok(Json(state.storage.list_company_content().await?))
}

/// GET /api/company-content/{section}
pub async fn get_section(
    State(state): State<AppState>,
    ApiPath(section): ApiPath<String>,
) -> Result<Json<CompanyContent>, ApiError> {
    state
        .storage
        .get_company_content_by_section(&section)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Content not found".to_string()))
}

/// PUT /api/admin/company-content - insert or replace by section
pub async fn upsert_content(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<UpsertCompanyContent>,
) -> Result<Json<CompanyContent>, ApiError> {
    let content = state.storage.upsert_company_content(&input).await?;
    tracing::info!(section = %content.section, "company content saved");
    Ok(Json(content))
}

/// PUT /api/admin/company-content/{id}
pub async fn update_content(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(input): ValidatedJson<UpdateCompanyContent>,
) -> Result<Json<CompanyContent>, ApiError> {
    Ok(Json(state.storage.update_company_content(id, &input).await?))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_then_read_section() {
        let t = TestApp::new().await;
        let (status, created) = t
            .admin(
                Method::PUT,
                "/api/admin/company-content",
                Some(json!({ "section": "hero", "title": "Comfort, year round" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = t.get("/api/company-content/hero").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Comfort, year round");
        assert_eq!(body["id"], created["id"]);

        let (_, list) = t.get("/api/company-content").await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_section_is_not_found() {
        let t = TestApp::new().await;
        let (status, body) = t.get("/api/company-content/about").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Content not found");
    }

    #[tokio::test]
    async fn test_partial_update_by_id() {
        let t = TestApp::new().await;
        let (_, created) = t
            .admin(
                Method::PUT,
                "/api/admin/company-content",
                Some(json!({ "section": "about", "title": "About us", "content": "Since 1998" })),
            )
            .await;
        let uri = format!("/api/admin/company-content/{}", created["id"]);

        let (status, updated) = t
            .admin(Method::PUT, &uri, Some(json!({ "title": "Our story" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Our story");
        assert_eq!(updated["content"], "Since 1998");

        let (status, _) = t
            .admin(Method::PUT, "/api/admin/company-content/999", Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upsert_requires_session_and_section() {
        let t = TestApp::new().await;
        let (status, body) = t
            .public(
                Method::PUT,
                "/api/admin/company-content",
                Some(json!({ "section": "hero" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");

        let (status, _) = t
            .admin(
                Method::PUT,
                "/api/admin/company-content",
                Some(json!({ "title": "No section" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, list) = t.get("/api/company-content").await;
        assert!(list.as_array().unwrap().is_empty());
    }
}
