/**
 * Routes Module
 * API route handlers and the public/admin routers built from them
 */

pub mod blog;
pub mod contact;
pub mod content;
pub mod extract;
pub mod health;
pub mod portfolio;
pub mod services;
pub mod team;
pub mod testimonials;

#[cfg(test)]
pub(crate) mod testing;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

/// Anonymous read endpoints plus the contact form.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/company-content", get(content::list_content))
        .route("/api/company-content/{section}", get(content::get_section))
        .route("/api/services", get(services::list_active))
        .route("/api/portfolio", get(portfolio::list_published))
        .route("/api/team", get(team::list_active))
        .route("/api/blog/posts", get(blog::list_published))
        .route("/api/blog/posts/{slug}", get(blog::get_post))
        .route("/api/blog/categories", get(blog::list_categories))
        .route("/api/blog/tags", get(blog::list_tags))
        .route("/api/testimonials", get(testimonials::list_published))
        .route("/api/contact", post(contact::submit))
}

/// Content management endpoints. The caller wraps these in the session guard.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/company-content", put(content::upsert_content))
        .route("/api/admin/company-content/{id}", put(content::update_content))
        .route(
            "/api/admin/services",
            get(services::list_all).post(services::create),
        )
        .route(
            "/api/admin/services/{id}",
            put(services::update).delete(services::delete),
        )
        .route(
            "/api/admin/portfolio",
            get(portfolio::list_all).post(portfolio::create),
        )
        .route(
            "/api/admin/portfolio/{id}",
            put(portfolio::update).delete(portfolio::delete),
        )
        .route("/api/admin/team", get(team::list_all).post(team::create))
        .route("/api/admin/team/{id}", put(team::update).delete(team::delete))
        .route(
            "/api/admin/blog/posts",
            get(blog::list_all).post(blog::create_post),
        )
        .route(
            "/api/admin/blog/posts/{id}",
            put(blog::update_post).delete(blog::delete_post),
        )
        .route(
            "/api/admin/blog/posts/{id}/tags/{tag_id}",
            put(blog::add_tag).delete(blog::remove_tag),
        )
        .route("/api/admin/blog/categories", post(blog::create_category))
        .route(
            "/api/admin/blog/categories/{id}",
            put(blog::update_category).delete(blog::delete_category),
        )
        .route("/api/admin/blog/tags", post(blog::create_tag))
        .route(
            "/api/admin/blog/tags/{id}",
            put(blog::update_tag).delete(blog::delete_tag),
        )
        .route(
            "/api/admin/testimonials",
            get(testimonials::list_all).post(testimonials::create),
        )
        .route(
            "/api/admin/testimonials/{id}",
            put(testimonials::update).delete(testimonials::delete),
        )
        .route("/api/admin/contact-submissions", get(contact::list))
        .route(
            "/api/admin/contact-submissions/{id}/read",
            put(contact::mark_read),
        )
        .route(
            "/api/admin/contact-submissions/{id}/unread",
            put(contact::mark_unread),
        )
}

/// Liveness and readiness checks.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_ping))
        .route("/health/ready", get(health::health_ready))
}
