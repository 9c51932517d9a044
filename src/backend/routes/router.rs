/**
 * Router Configuration
 *
 * Combines the API routes with the cross-cutting HTTP layers into the
 * router handed to `axum::serve`.
 *
 * # Layers
 *
 * - `TraceLayer` - request spans through `tracing`
 * - `CorsLayer` - permissive CORS for browser dashboards
 */

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = configure_api_routes(Router::new(), &app_state);

    let router = router.fallback(|| async {
        (
            axum::http::StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({ "error": "not found", "status": 404 })),
        )
    });

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::store::{MemoryStore, Stores};
    use crate::shared::AppConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router<()> {
        let config = AppConfig::builder().jwt_secret("router-test").build().unwrap();
        let stores = Stores::from_backend(Arc::new(MemoryStore::new()));
        create_router(AppState::new(config, stores))
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_not_401() {
        let response = router()
            .oneshot(Request::builder().uri("/api/v1/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_space_routes_require_token() {
        let uri = format!("/api/v1/bot-spaces/{}/tasks", uuid::Uuid::new_v4());
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
