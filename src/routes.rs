//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod analysis;
mod connection;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let cors = build_cors_layer(settings);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(timeout_layer(settings))
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Connection routes
        .route(
            "/api/connections",
            post(connection::connect).get(connection::list_connections),
        )
        .route(
            "/api/connections/{id}",
            get(connection::get_connection).delete(connection::disconnect),
        )

        // Analysis routes
        .route(
            "/api/connections/{id}/analysis",
            post(analysis::full_analysis).get(analysis::latest_snapshot),
        )
        .route("/api/connections/{id}/analysis/fast", get(analysis::fast_snapshot))
        .route("/api/connections/{id}/analysis/refresh", post(analysis::refresh))
        .route("/api/connections/{id}/analysis/object", post(analysis::analyse_object))
        .route("/api/snapshots", get(analysis::list_snapshots))

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Requests running past the configured limit end with 408
fn timeout_layer(settings: &Settings) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(settings.server.request_timeout_secs),
    )
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    cors.allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> Router {
        let settings = Settings::default();
        create_router(Arc::new(AppState::new(&settings)), &settings)
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_analysis_of_unknown_connection_is_not_found() {
        let uri = format!("/api/connections/{}/analysis", Uuid::new_v4());
        let (status, body) = send(Request::post(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_latest_snapshot_requires_an_analysis() {
        let uri = format!("/api/connections/{}/analysis", Uuid::new_v4());
        let (status, _) = send(Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(Request::get("/api/snapshots").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        let mut settings = Settings::default();
        settings.server.request_timeout_secs = 0;

        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(&settings));

        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_connect_validates_payload() {
        let request = Request::post("/api/connections")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"connectionString":"pg"}"#))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_dialect() {
        let request = Request::post("/api/connections")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"connectionString":"postgres://u:p@localhost/app","dialect":"oracle"}"#,
            ))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
