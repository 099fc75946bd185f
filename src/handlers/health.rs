use axum::{Json, response::IntoResponse};
use serde_json::json;

// health handler
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn liveness_handler() -> impl IntoResponse {
    Json(json!({ "message": "OK" }))
}

// nothing to warm up, ready as soon as the listener is bound
pub async fn readiness_handler() -> impl IntoResponse {
    Json(json!({ "message": "OK" }))
}

#[cfg(test)]
mod tests {
    use crate::extraction::OpenAiExtractor;
    use crate::handlers::router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    fn app() -> axum::Router {
        let extractor = OpenAiExtractor::new(
            reqwest::Client::new(),
            "http://localhost:9",
            "",
            "gpt-4.1-mini",
            16,
        );
        let state = AppState::new(Arc::new(extractor), 1, Duration::from_secs(60), None);
        router(Arc::new(state), 1024)
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn liveness_and_readiness_report_ok() {
        for uri in ["/actuator/health/liveness", "/actuator/health/readiness"] {
            let (status, body) = get_json(uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "OK");
        }

        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }
}
