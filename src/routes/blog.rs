/**
 * Blog Routes
 * Public reading endpoints and admin management of posts, categories and tags
 */
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::db::models::{
    slugify, BlogCategory, BlogPost, BlogPostWithTags, BlogTag, NewBlogCategory, NewBlogPost,
    NewBlogTag, UpdateBlogCategory, UpdateBlogPost, UpdateBlogTag,
};
use crate::error::ApiError;
use crate::routes::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

/// Sanitize HTML content using ammonia
fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Explicit slugs are already validated; derived ones can come out empty.
fn resolve_slug(explicit: Option<&str>, source: &str) -> Result<String, ApiError> {
    let slug = explicit.map(str::to_string).unwrap_or_else(|| slugify(source));
    if slug.is_empty() {
        return Err(ApiError::BadRequest(
            "Could not derive a slug; provide one explicitly".to_string(),
        ));
    }
    Ok(slug)
}

async fn ensure_post(state: &AppState, id: i32) -> Result<BlogPost, ApiError> {
    state
        .storage
        .get_blog_post(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog post not found".to_string()))
}

// ============================================================================
// Public
// ============================================================================

/// GET /api/blog/posts
pub async fn list_published(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.storage.list_published_blog_posts().await?))
}

/// GET /api/blog/posts/{slug}
pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<BlogPostWithTags>, ApiError> {
    let post = state
        .storage
        .get_blog_post_by_slug(&slug)
        .await?
        .filter(|p| p.is_published)
        .ok_or_else(|| ApiError::NotFound("Blog post not found".to_string()))?;
    let tags = state.storage.list_post_tags(post.id).await?;
    Ok(Json(BlogPostWithTags { post, tags }))
}

/// GET /api/blog/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogCategory>>, ApiError> {
    Ok(Json(state.storage.list_blog_categories().await?))
}

/// GET /api/blog/tags
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<BlogTag>>, ApiError> {
    Ok(Json(state.storage.list_blog_tags().await?))
}

// ============================================================================
// Admin: posts
// ============================================================================

/// GET /api/admin/blog/posts - drafts included, newest first
pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.storage.list_blog_posts().await?))
}

/// POST /api/admin/blog/posts
pub async fn create_post(
    State(state): State<AppState>,
    ValidatedJson(mut input): ValidatedJson<NewBlogPost>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    input.slug = Some(resolve_slug(input.slug.as_deref(), &input.title)?);
    input.content = input.content.as_deref().map(sanitize_html);
    if input.is_published && input.published_at.is_none() {
        input.published_at = Some(Utc::now());
    }

    let post = state.storage.create_blog_post(&input).await?;
    tracing::info!(id = post.id, slug = %post.slug, published = post.is_published, "blog post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/admin/blog/posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(mut input): ValidatedJson<UpdateBlogPost>,
) -> Result<Json<BlogPost>, ApiError> {
    let existing = ensure_post(&state, id).await?;
    input.content = input
        .content
        .map(|content| content.as_deref().map(sanitize_html));
    if input.is_published == Some(true)
        && existing.published_at.is_none()
        && input.published_at.flatten().is_none()
    {
        input.published_at = Some(Some(Utc::now()));
    }

    let post = state.storage.update_blog_post(id, &input).await?;
    tracing::info!(id, slug = %post.slug, "blog post updated");
    Ok(Json(post))
}

/// DELETE /api/admin/blog/posts/{id} - tag links go with it
pub async fn delete_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_blog_post(id).await?;
    tracing::info!(id, "blog post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/blog/posts/{id}/tags/{tagId}
pub async fn add_tag(
    State(state): State<AppState>,
    ApiPath((id, tag_id)): ApiPath<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    ensure_post(&state, id).await?;
    state.storage.add_tag_to_post(id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/blog/posts/{id}/tags/{tagId}
pub async fn remove_tag(
    State(state): State<AppState>,
    ApiPath((id, tag_id)): ApiPath<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    ensure_post(&state, id).await?;
    state.storage.remove_tag_from_post(id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin: categories and tags
// ============================================================================

/// POST /api/admin/blog/categories
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(mut input): ValidatedJson<NewBlogCategory>,
) -> Result<(StatusCode, Json<BlogCategory>), ApiError> {
    input.slug = Some(resolve_slug(input.slug.as_deref(), &input.name)?);
    let category = state.storage.create_blog_category(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/blog/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(input): ValidatedJson<UpdateBlogCategory>,
) -> Result<Json<BlogCategory>, ApiError> {
    Ok(Json(state.storage.update_blog_category(id, &input).await?))
}

/// DELETE /api/admin/blog/categories/{id} - posts keep existing, uncategorized
pub async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_blog_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/blog/tags
pub async fn create_tag(
    State(state): State<AppState>,
    ValidatedJson(mut input): ValidatedJson<NewBlogTag>,
) -> Result<(StatusCode, Json<BlogTag>), ApiError> {
    input.slug = Some(resolve_slug(input.slug.as_deref(), &input.name)?);
    let tag = state.storage.create_blog_tag(&input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PUT /api/admin/blog/tags/{id}
pub async fn update_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(input): ValidatedJson<UpdateBlogTag>,
) -> Result<Json<BlogTag>, ApiError> {
    Ok(Json(state.storage.update_blog_tag(id, &input).await?))
}

/// DELETE /api/admin/blog/tags/{id}
pub async fn delete_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_blog_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::TestApp;
    use axum::http::Method;
    use serde_json::{json, Value};

    async fn create_post_json(t: &TestApp, body: Value) -> Value {
        let (status, post) = t.admin(Method::POST, "/api/admin/blog/posts", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        post
    }

    #[test]
    fn test_sanitize_html() {
        let html = "<p>Hello</p><script>alert('xss')</script>";
        let sanitized = sanitize_html(html);
        assert!(sanitized.contains("<p>Hello</p>"));
        assert!(!sanitized.contains("<script>"));
    }

    #[test]
    fn test_resolve_slug() {
        assert_eq!(resolve_slug(None, "Furnace Filters 101").unwrap(), "furnace-filters-101");
        assert_eq!(resolve_slug(Some("custom"), "ignored").unwrap(), "custom");
        assert!(resolve_slug(None, "!!!").is_err());
    }

    #[tokio::test]
    async fn test_create_post_derives_slug_and_sanitizes() {
        let t = TestApp::new().await;
        let post = create_post_json(
            &t,
            json!({
                "title": "Winter Prep: 5 Tips",
                "content": "<p>Change filters</p><script>steal()</script>",
                "isPublished": true
            }),
        )
        .await;

        assert_eq!(post["slug"], "winter-prep-5-tips");
        let content = post["content"].as_str().unwrap();
        assert!(content.contains("<p>Change filters</p>"));
        assert!(!content.contains("script"));
        assert!(post["publishedAt"].is_string());
    }

    #[tokio::test]
    async fn test_untitled_slug_is_rejected() {
        let t = TestApp::new().await;
        let (status, _) = t
            .admin(Method::POST, "/api/admin/blog/posts", Some(json!({ "title": "???" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = t
            .admin(
                Method::POST,
                "/api/admin/blog/posts",
                Some(json!({ "title": "Ok", "slug": "Not A Slug" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let t = TestApp::new().await;
        create_post_json(&t, json!({ "title": "Duct Cleaning" })).await;
        let (status, _) = t
            .admin(Method::POST, "/api/admin/blog/posts", Some(json!({ "title": "Duct cleaning" })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public() {
        let t = TestApp::new().await;
        create_post_json(&t, json!({ "title": "Live Post", "isPublished": true })).await;
        let draft = create_post_json(&t, json!({ "title": "Draft Post" })).await;
        assert!(draft["publishedAt"].is_null());

        let (_, public) = t.get("/api/blog/posts").await;
        assert_eq!(public.as_array().unwrap().len(), 1);
        let (status, _) = t.get("/api/blog/posts/draft-post").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = t.admin(Method::GET, "/api/admin/blog/posts", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_publishing_stamps_once() {
        let t = TestApp::new().await;
        let draft = create_post_json(&t, json!({ "title": "Thermostat Guide" })).await;
        let uri = format!("/api/admin/blog/posts/{}", draft["id"]);

        let (status, first) = t
            .admin(Method::PUT, &uri, Some(json!({ "isPublished": true })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let stamped = first["publishedAt"].clone();
        assert!(stamped.is_string());

        let (_, second) = t
            .admin(Method::PUT, &uri, Some(json!({ "isPublished": true, "excerpt": "Short" })))
            .await;
        assert_eq!(second["publishedAt"], stamped);

        let (status, _) = t
            .admin(Method::PUT, "/api/admin/blog/posts/999", Some(json!({ "title": "x" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_clears_nullable_fields() {
        let t = TestApp::new().await;
        let (_, category) = t
            .admin(
                Method::POST,
                "/api/admin/blog/categories",
                Some(json!({ "name": "Maintenance" })),
            )
            .await;
        let post = create_post_json(
            &t,
            json!({
                "title": "Coil Cleaning",
                "categoryId": category["id"],
                "imageUrl": "coil.png",
                "excerpt": "Keep it clean"
            }),
        )
        .await;
        let uri = format!("/api/admin/blog/posts/{}", post["id"]);

        let (status, updated) = t
            .admin(Method::PUT, &uri, Some(json!({ "categoryId": null, "imageUrl": null })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(updated["categoryId"].is_null());
        assert!(updated["imageUrl"].is_null());
        assert_eq!(updated["excerpt"], "Keep it clean");
    }

    #[tokio::test]
    async fn test_tag_links_and_public_post_view() {
        let t = TestApp::new().await;
        let post = create_post_json(&t, json!({ "title": "Heat Pump FAQ", "isPublished": true })).await;
        let (status, tag) = t
            .admin(Method::POST, "/api/admin/blog/tags", Some(json!({ "name": "Heat Pumps" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(tag["slug"], "heat-pumps");

        let link = format!("/api/admin/blog/posts/{}/tags/{}", post["id"], tag["id"]);
        for _ in 0..2 {
            let (status, _) = t.admin(Method::PUT, &link, None).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (status, view) = t.get("/api/blog/posts/heat-pump-faq").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["title"], "Heat Pump FAQ");
        assert_eq!(view["tags"].as_array().unwrap().len(), 1);

        let (status, _) = t.admin(Method::DELETE, &link, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, view) = t.get("/api/blog/posts/heat-pump-faq").await;
        assert!(view["tags"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_link_missing_targets() {
        let t = TestApp::new().await;
        let post = create_post_json(&t, json!({ "title": "Orphan" })).await;

        let (status, _) = t
            .admin(Method::PUT, "/api/admin/blog/posts/999/tags/1", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = t
            .admin(Method::PUT, &format!("/api/admin/blog/posts/{}/tags/999", post["id"]), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_post_removes_it() {
        let t = TestApp::new().await;
        let post = create_post_json(&t, json!({ "title": "Gone Soon", "isPublished": true })).await;
        let (_, tag) = t
            .admin(Method::POST, "/api/admin/blog/tags", Some(json!({ "name": "Misc" })))
            .await;
        t.admin(
            Method::PUT,
            &format!("/api/admin/blog/posts/{}/tags/{}", post["id"], tag["id"]),
            None,
        )
        .await;

        let uri = format!("/api/admin/blog/posts/{}", post["id"]);
        let (status, _) = t.admin(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = t.get("/api/blog/posts/gone-soon").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // the tag itself survives
        let (_, tags) = t.get("/api/blog/tags").await;
        assert_eq!(tags.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_lifecycle() {
        let t = TestApp::new().await;
        let (status, category) = t
            .admin(
                Method::POST,
                "/api/admin/blog/categories",
                Some(json!({ "name": "Energy Savings" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(category["slug"], "energy-savings");

        let (status, _) = t
            .admin(
                Method::POST,
                "/api/admin/blog/categories",
                Some(json!({ "name": "Energy Savings" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let post = create_post_json(
            &t,
            json!({ "title": "Cut Your Bill", "categoryId": category["id"], "isPublished": true }),
        )
        .await;
        assert_eq!(post["categoryId"], category["id"]);

        let uri = format!("/api/admin/blog/categories/{}", category["id"]);
        let (status, renamed) = t
            .admin(Method::PUT, &uri, Some(json!({ "description": "Lower utility costs" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Energy Savings");

        let (status, _) = t.admin(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, view) = t.get("/api/blog/posts/cut-your-bill").await;
        assert!(view["categoryId"].is_null());
        let (_, categories) = t.get("/api/blog/categories").await;
        assert!(categories.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_reference() {
        let t = TestApp::new().await;
        let (status, _) = t
            .admin(
                Method::POST,
                "/api/admin/blog/posts",
                Some(json!({ "title": "Lost", "categoryId": 404 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
