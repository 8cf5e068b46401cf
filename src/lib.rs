//! HVAC Site Backend - library for app logic and testing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;
pub mod storage;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::auth::{hosted, local};
use crate::config::{AppConfig, AuthMode};
use crate::logging::LogConfig;
use crate::state::AppState;
use crate::storage::{MemoryStorage, PgStorage, Storage};

/// Configure CORS for the configured frontend origins. Unparseable entries
/// are skipped with a warning.
pub fn configure_cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config.allowed_origins);

    let mut open = Router::new();
    let mut guarded = routes::admin_routes().route("/api/admin/user", get(auth::current_identity));
    match &state.config.auth {
        AuthMode::Local => {
            open = open
                .route("/api/admin/login", post(local::login))
                .route("/api/admin/logout", post(local::logout));
        }
        AuthMode::Hosted(_) => {
            open = open
                .route("/api/login", get(hosted::login))
                .route("/api/callback", get(hosted::callback))
                .route("/api/logout", get(hosted::logout));
            guarded = guarded.route("/api/auth/user", get(hosted::auth_user));
        }
    }
    let guarded = guarded.route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_session,
    ));

    Router::new()
        .merge(routes::public_routes())
        .merge(open)
        .merge(guarded)
        .merge(routes::health_routes())
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

/// Postgres when a database is configured, otherwise the in-memory store.
async fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    match &config.database {
        Some(db_config) => {
            let pool = db::init_pool(db_config)
                .await
                .with_context(|| format!("could not connect to {}", db_config.redacted_url()))?;
            db::run_migrations(&pool)
                .await
                .context("database migrations failed")?;
            tracing::info!(database = %db_config.redacted_url(), "using PostgreSQL storage");
            Ok(Arc::new(PgStorage::new(pool)))
        }
        None => {
            if config.is_production() {
                tracing::warn!("DATABASE_URL not set in production; data will not persist");
            } else {
                tracing::info!("DATABASE_URL not set. Using in-memory storage.");
            }
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Guards must outlive the server or buffered log lines are lost.
    let _log_guards = logging::init(&LogConfig::from_env());

    routes::health::init_start_time();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.is_production() && !config.secure_cookies {
        tracing::warn!("SECURITY: session cookies are not marked Secure in production");
    }

    let storage = build_storage(&config).await?;

    match (&config.auth, &config.admin_seed) {
        (AuthMode::Local, Some(seed)) => local::seed_admin(storage.as_ref(), seed).await?,
        (AuthMode::Local, None) => {
            tracing::info!("ADMIN_USERNAME not set; use create-admin to add an account")
        }
        (AuthMode::Hosted(oidc), _) => {
            tracing::info!(issuer = %oidc.issuer, "admin sign-in delegated to identity provider")
        }
    }

    let addr = config.socket_addr()?;
    let app = create_app(AppState::new(storage, config));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OidcConfig;
    use crate::routes::testing::TestApp;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use url::Url;

    fn hosted_config() -> AppConfig {
        AppConfig {
            auth: AuthMode::Hosted(OidcConfig {
                issuer: "https://id.example.com".into(),
                client_id: "hvac-site".into(),
                client_secret: "secret".into(),
                redirect_uri: "http://localhost:3001/api/callback".into(),
                authorize_url: Url::parse("https://id.example.com/authorize").unwrap(),
                token_url: Url::parse("https://id.example.com/token").unwrap(),
                end_session_url: None,
            }),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let t = TestApp::new().await;
        let (status, body) = t.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_local_mode_routes() {
        let t = TestApp::new().await;
        let (status, _) = t.get("/api/login").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, identity) = t.admin(Method::GET, "/api/admin/user", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(identity["username"], "owner");

        let (status, body) = t.get("/api/admin/user").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_hosted_mode_routes() {
        let t = TestApp::with_config(hosted_config()).await;
        let (status, _) = t
            .public(
                Method::POST,
                "/api/admin/login",
                Some(serde_json::json!({ "username": "a", "password": "b" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = t.get("/api/login").await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (status, _) = t.get("/api/auth/user").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let app = create_app(AppState::in_memory(AppConfig::default()));
        let res = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/services")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            res.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            res.headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let app = create_app(AppState::in_memory(AppConfig::default()));
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(res.headers().contains_key("x-request-id"));
    }
}
