//! Router configuration for Web API.

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    approve_submission, create_submission, delete_submission, forgot_confirm_reset,
    forgot_request_code, get_submission, get_suggested_questions, get_summary,
    list_my_submissions, list_pending_submissions, list_submissions, login, reject_submission,
    signup_confirm_code, signup_request_code, AppState,
};
use super::middleware::{
    api_rate_limit, auth_rate_limit, create_cors_layer, jwt_auth, security_headers,
    RateLimitState,
};

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, rate_limit: Arc<RateLimitState>) -> Router {
    let auth_limit = rate_limit.clone();
    let auth_routes = Router::new()
        .route("/signup/request-code", post(signup_request_code))
        .route("/signup/confirm-code", post(signup_confirm_code))
        .route("/login", post(login))
        .route("/forgot/request-code", post(forgot_request_code))
        .route("/forgot/confirm-reset", post(forgot_confirm_reset))
        .route_layer(middleware::from_fn(move |req, next| {
            auth_rate_limit(auth_limit.clone(), req, next)
        }));

    let api_limit = rate_limit;
    let submission_routes = Router::new()
        .route("/", post(create_submission).get(list_submissions))
        .route("/mine", get(list_my_submissions))
        .route("/pending", get(list_pending_submissions))
        .route("/:id", get(get_submission).delete(delete_submission))
        .route("/:id/summary", get(get_summary))
        .route("/:id/suggested-questions", get(get_suggested_questions))
        .route("/:id/approve", patch(approve_submission))
        .route("/:id/reject", patch(reject_submission))
        .route_layer(middleware::from_fn(move |req, next| {
            api_rate_limit(api_limit.clone(), req, next)
        }));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/submissions", submission_routes);

    let keys = app_state.keys.clone();
    let cors = create_cors_layer(&app_state.config.server.cors_origins);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(keys.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_router() {
        let response = create_health_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
