// server.rs - Router assembly and the two unauthenticated status endpoints

use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::config;
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{cron_secret_middleware, jwt_auth_middleware, load_profile_middleware};

/// Full application router. Route groups carry their own auth layers; CORS,
/// tracing and the body cap wrap everything.
pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // JWT only, for users who may not have a profile yet
        .merge(session_routes())
        // JWT + loaded profile
        .merge(okr_routes())
        // Shared-secret cron triggers
        .merge(internal_routes())
        .fallback(unknown_route)
        // Global middleware
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config().api.max_request_size_bytes))
}

fn public_routes() -> Router {
    use axum::routing::post;
    use handlers::public::{invitations, webhooks};

    Router::new()
        // Invitation preview for the signup page, keyed by raw token
        .route("/invitations/:token", get(invitations::preview))
        // Email provider callbacks; always answers 200
        .route("/webhooks/email", post(webhooks::email_event))
}

fn session_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::{auth, invitations, onboarding};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/onboarding/company", post(onboarding::create_company))
        .route("/api/invitations/accept", post(invitations::accept))
        .layer(middleware::from_fn(jwt_auth_middleware))
}

fn okr_routes() -> Router {
    use axum::routing::{delete, post, put};
    use handlers::protected::{
        activities, ai, company, initiatives, invitations, objectives, profile,
    };

    Router::new()
        // Own profile and the member directory
        .route("/api/profile", get(profile::show).put(profile::update))
        .route("/api/profiles", get(profile::list))
        .route("/api/profiles/:id", put(profile::update_member))
        // Company settings
        .route("/api/company", get(company::show).put(company::update))
        // Invitation management
        .route(
            "/api/invitations",
            get(invitations::list).post(invitations::create),
        )
        .route("/api/invitations/:id", delete(invitations::revoke))
        // The OKR tree
        .route(
            "/api/objectives",
            get(objectives::list).post(objectives::create),
        )
        .route(
            "/api/objectives/:id",
            get(objectives::show)
                .put(objectives::update)
                .delete(objectives::delete),
        )
        .route(
            "/api/initiatives",
            get(initiatives::list).post(initiatives::create),
        )
        .route(
            "/api/initiatives/:id",
            get(initiatives::show)
                .put(initiatives::update)
                .delete(initiatives::delete),
        )
        .route(
            "/api/activities",
            get(activities::list).post(activities::create),
        )
        .route(
            "/api/activities/:id",
            get(activities::show)
                .put(activities::update)
                .patch(activities::patch_status)
                .delete(activities::delete),
        )
        // AI assistance
        .route("/api/ai/suggestions", post(ai::suggestions))
        .route("/api/ai/analysis", post(ai::analysis))
        .layer(middleware::from_fn(load_profile_middleware))
        .layer(middleware::from_fn(jwt_auth_middleware))
}

fn internal_routes() -> Router {
    use axum::routing::post;
    use handlers::internal::cron;

    Router::new()
        .route("/internal/cron/weekly-report", post(cron::weekly_report))
        .route("/internal/cron/okr-analysis", post(cron::okr_analysis))
        .layer(middleware::from_fn(cron_secret_middleware))
}

fn cors_layer() -> CorsLayer {
    let security = &config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Compass API",
            "version": version,
            "description": "Multi-tenant OKR tracking backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "invitation_preview": "/invitations/:token (public)",
                "email_webhook": "/webhooks/email (public - provider callbacks)",
                "auth": "/api/auth/whoami (JWT)",
                "onboarding": "/api/onboarding/company (JWT)",
                "profiles": "/api/profile, /api/profiles[/:id] (JWT + profile)",
                "company": "/api/company (JWT + profile)",
                "invitations": "/api/invitations[/:id], /api/invitations/accept (JWT)",
                "objectives": "/api/objectives[/:id] (JWT + profile)",
                "initiatives": "/api/initiatives[/:id] (JWT + profile)",
                "activities": "/api/activities[/:id] (JWT + profile)",
                "ai": "/api/ai/suggestions, /api/ai/analysis (JWT + profile)",
                "internal": "/internal/cron/* (cron secret)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "code": "SERVICE_UNAVAILABLE",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

async fn unknown_route() -> ApiError {
    ApiError::not_found("Route not found")
}
