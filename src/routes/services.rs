/**
 * Service Routes
 * HVAC service offerings shown on the public site
 */
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::db::models::{NewService, Service, UpdateService};
use crate::error::ApiError;
use crate::routes::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

/// GET /api/services - active services only
pub async fn list_active(State(state): State<AppState>) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.storage.list_active_services().await?))
}

/// GET /api/admin/services
pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.storage.list_services().await?))
}

/// POST /api/admin/services
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewService>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    let service = state.storage.create_service(&input).await?;
    tracing::info!(id = service.id, "service created");
    Ok((StatusCode::CREATED, Json(service)))
}

/// PUT /api/admin/services/{id}
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(input): ValidatedJson<UpdateService>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.storage.update_service(id, &input).await?))
}

/// DELETE /api/admin/services/{id}
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_service(id).await?;
    tracing::info!(id, "service deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_public_list_hides_inactive() {
        let t = TestApp::new().await;
        let (status, created) = t
            .admin(
                Method::POST,
                "/api/admin/services",
                Some(json!({ "title": "AC Repair", "icon": "fas fa-snowflake", "sortOrder": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "AC Repair");
        assert_eq!(created["isActive"], true);

        t.admin(
            Method::POST,
            "/api/admin/services",
            Some(json!({ "title": "Legacy Boilers", "isActive": false })),
        )
        .await;

        let (status, public) = t.get("/api/services").await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = public
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["AC Repair"]);

        let (_, all) = t.admin(Method::GET, "/api/admin/services", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let t = TestApp::new().await;
        let (_, created) = t
            .admin(Method::POST, "/api/admin/services", Some(json!({ "title": "Heating" })))
            .await;
        let uri = format!("/api/admin/services/{}", created["id"]);
        let payload = json!({ "title": "Furnace Service", "sortOrder": 1 });

        let (status, first) = t.admin(Method::PUT, &uri, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = t.admin(Method::PUT, &uri, Some(payload)).await;
        assert_eq!(first["title"], second["title"]);
        assert_eq!(first["sortOrder"], second["sortOrder"]);
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let t = TestApp::new().await;
        let (_, created) = t
            .admin(Method::POST, "/api/admin/services", Some(json!({ "title": "Ductwork" })))
            .await;
        let uri = format!("/api/admin/services/{}", created["id"]);

        let (status, _) = t.admin(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = t.admin(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_json_bad_request() {
        let t = TestApp::new().await;
        let (status, body) = t.admin(Method::DELETE, "/api/admin/services/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid path parameter");
    }

    #[tokio::test]
    async fn test_invalid_payload_rejected_without_mutation() {
        let t = TestApp::new().await;
        let (status, body) = t
            .admin(Method::POST, "/api/admin/services", Some(json!({ "title": "" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body["errors"].as_array().unwrap().is_empty());

        let (_, all) = t.admin(Method::GET, "/api/admin/services", None).await;
        assert!(all.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        let t = TestApp::new().await;
        let (status, _) = t.public(Method::GET, "/api/admin/services", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = t
            .public(Method::POST, "/api/admin/services", Some(json!({ "title": "Sneaky" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, public) = t.get("/api/services").await;
        assert!(public.as_array().unwrap().is_empty());
    }
}
