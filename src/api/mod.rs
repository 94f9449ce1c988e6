// REST surface: unauthenticated health probe, authenticated routes under /api.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::State,
    middleware,
    routing::get,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{CurrentUser, TokenVerifier, UserStore, authenticate};
use crate::config::Environment;
use crate::error::ApiError;

/// Shared context for all routes and the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub verifier: Arc<TokenVerifier>,
    pub environment: Environment,
}

/// Build the full application router.
///
/// Business routes live under `/api`, behind the auth middleware; `/health`
/// stays outside it for probes.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/me", get(me))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Return the user record the auth middleware attached to this request.
async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .users
        .get_by_id(user.user_id())
        .await
        .map_err(|e| ApiError::internal(state.environment, e))?
        .ok_or_else(|| {
            ApiError::internal(
                state.environment,
                anyhow::anyhow!("authenticated user record missing: {}", user.user_id()),
            )
        })?;

    Ok(Json(serde_json::json!({
        "id": record.id.to_string(),
        "subject": record.subject,
    })))
}
