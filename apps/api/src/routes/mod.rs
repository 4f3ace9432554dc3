pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/generate-prompts", post(handlers::handle_generate_prompts))
        // Path used by the event-creation page
        .route(
            "/api/generate-prompts",
            post(handlers::handle_generate_prompts),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::{Config, UpstreamSettings};
    use crate::generation::fallback::fallback_prompts;
    use crate::generation::generator::PromptGenerator;
    use crate::llm_client::backoff::BackoffConfig;
    use crate::llm_client::LlmClient;

    fn state_with(upstream: UpstreamSettings) -> AppState {
        let config = Config {
            upstream: upstream.clone(),
            backoff: BackoffConfig {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                min_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                jitter_ratio: 0.0,
            },
            ..Config::default()
        };
        let transport = Arc::new(LlmClient::new(config.request_timeout).unwrap());
        let generator = PromptGenerator::new(upstream, config.backoff.clone(), transport);
        AppState {
            config,
            generator: Arc::new(generator),
        }
    }

    async fn post_json(router: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_upstream_configuration() {
        let router = build_router(state_with(UpstreamSettings::default()));
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["upstreamConfigured"], false);
    }

    #[tokio::test]
    async fn test_generate_without_key_serves_fallback() {
        let router = build_router(state_with(UpstreamSettings::default()));

        let (status, body) = post_json(
            router,
            "/generate-prompts",
            r#"{"name":"Bake Off","description":"baking","count":3}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usedFallback"], true);
        assert_eq!(body["prompts"], serde_json::to_value(fallback_prompts(3)).unwrap());
        assert!(body["reason"].as_str().unwrap().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_count_above_fifty_is_honoured() {
        let router = build_router(state_with(UpstreamSettings::default()));

        let (status, body) = post_json(router, "/generate-prompts", r#"{"count":60}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prompts"].as_array().unwrap().len(), 60);
    }

    #[tokio::test]
    async fn test_garbage_body_still_answers_200_with_default_count() {
        let router = build_router(state_with(UpstreamSettings::default()));

        let (status, body) = post_json(router, "/api/generate-prompts", "not json at all").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prompts"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_generate_with_upstream_returns_model_prompts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content":
                    "{\"prompts\":[{\"optionA\":\"Sourdough\",\"optionB\":\"Brioche\"},{\"optionA\":\"Whisk\",\"optionB\":\"Spatula\"}]}"
                } }]
            })))
            .mount(&server)
            .await;

        let router = build_router(state_with(UpstreamSettings {
            api_key: Some("sk-test".to_string()),
            base_url: server.uri(),
            ..UpstreamSettings::default()
        }));

        let (status, body) = post_json(
            router,
            "/generate-prompts",
            r#"{"name":"Bake Off","description":"baking","count":2,"relatedToEvent":true}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usedFallback"], false);
        assert!(body.get("reason").is_none());
        assert_eq!(
            body["prompts"],
            json!([
                { "optionA": "Sourdough", "optionB": "Brioche" },
                { "optionA": "Whisk", "optionB": "Spatula" }
            ])
        );
    }

    #[tokio::test]
    async fn test_upstream_error_still_answers_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let router = build_router(state_with(UpstreamSettings {
            api_key: Some("sk-test".to_string()),
            base_url: server.uri(),
            ..UpstreamSettings::default()
        }));

        let (status, body) = post_json(router, "/generate-prompts", r#"{"count":4}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usedFallback"], true);
        assert_eq!(body["prompts"].as_array().unwrap().len(), 4);
        assert!(body["reason"].as_str().unwrap().starts_with("HTTP 503"));
    }
}
