//! Router construction and server entry point.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::Json;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::types::HealthResponse;
use super::{chat, plan, tasks};
use crate::config::Config;
use crate::planner::Planner;
use crate::store::init_store;

/// Shared application state.
pub struct AppState {
    pub planner: Planner,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let providers = config.build_providers()?;
    let store = init_store(&config.store)?;
    let planner = Planner::new(providers, config.plan_provider, store).with_policy(config.policy.clone());
    tracing::info!(
        "Planning with {} (max task minutes: {:?}, waiting periods: {})",
        config.plan_provider,
        config.policy.max_task_minutes,
        config.policy.waiting_periods
    );

    let state = Arc::new(AppState { planner });
    let app = build_router(state, &config.cors_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the API router over shared state.
pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/plan", post(plan::plan))
        .route("/breakdown", post(plan::breakdown))
        .route("/chat", post(chat::chat))
        .route("/api/health", get(health))
        .route("/api/plan", post(plan::plan_day))
        .route("/api/generate-subtasks", post(plan::generate_subtasks))
        .route("/api/tasks", get(tasks::list_tasks))
        .route("/api/tasks/:id", patch(tasks::update_task))
        .route("/api/subtasks/:id", patch(tasks::update_subtask))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        provider: state.planner.default_provider(),
        persistent: state.planner.is_persistent(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use crate::llm::{LlmError, ProviderKind, ProviderRegistry};
    use crate::store::InMemoryTaskStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with(providers: Vec<Arc<ScriptedProvider>>) -> Router {
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider);
        }
        let planner = Planner::new(
            registry,
            ProviderKind::Gpt4o,
            Arc::new(InMemoryTaskStore::new()),
        );
        let origins = vec!["http://localhost:5173".to_string()];
        build_router(Arc::new(AppState { planner }), &origins)
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
            None => Body::empty(),
        };
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));
        (status, json)
    }

    fn tasks_reply(tasks: Value) -> String {
        json!({ "tasks": tasks }).to_string()
    }

    #[tokio::test]
    async fn health_reports_provider_and_store() {
        let app = app_with(vec![Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o))]);
        let (status, json) = json_request(app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"], "gpt4o");
        assert_eq!(json["persistent"], false);
    }

    #[tokio::test]
    async fn plan_returns_tasks() {
        let provider = Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o).reply(tasks_reply(
            json!([{"name": "Write blog", "description": "Draft and edit", "duration_minutes": 300, "priority": 1}]),
        )));
        let app = app_with(vec![provider]);

        let (status, json) = json_request(
            app,
            Method::POST,
            "/plan",
            Some(json!({"prompt": "write a blog in 5 hours"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let tasks = json["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["duration_minutes"], 300);
        assert_eq!(tasks[0]["is_completed"], false);
        assert!(tasks[0]["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn invalid_date_is_400_without_provider_call() {
        let provider = Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o));
        let app = app_with(vec![provider.clone()]);

        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/plan",
            Some(json!({"prompt": "write a blog", "user_id": "user-1", "date": "2024-13-45"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].as_str().unwrap().contains("2024-13-45"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn chat_with_unknown_model_is_400() {
        let claude = Arc::new(ScriptedProvider::new(ProviderKind::Claude).reply("hello"));
        let app = app_with(vec![claude.clone()]);

        let (status, json) = json_request(
            app.clone(),
            Method::POST,
            "/chat",
            Some(json!({"model": "invalid_model", "messages": [{"role": "user", "content": "hi"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].as_str().unwrap().contains("invalid_model"));
        assert_eq!(claude.call_count(), 0);

        let (status, json) = json_request(
            app,
            Method::POST,
            "/chat",
            Some(json!({"model": "claude", "messages": [{"role": "user", "content": "hi"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "hello");
    }

    #[tokio::test]
    async fn bad_bodies_are_400_with_detail() {
        let app = app_with(vec![Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o))]);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/plan")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let (status, json) =
            json_request(app.clone(), Method::POST, "/plan", Some(json!({"goal": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].is_string());

        let (status, _) =
            json_request(app, Method::POST, "/plan", Some(json!({"prompt": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_failures_are_500() {
        let provider = Arc::new(
            ScriptedProvider::new(ProviderKind::Gpt4o)
                .fail(LlmError::network_error("Request timeout".to_string()))
                .reply("no json here"),
        );
        let app = app_with(vec![provider]);

        let (status, json) = json_request(
            app.clone(),
            Method::POST,
            "/plan",
            Some(json!({"prompt": "clean"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["detail"].as_str().unwrap().contains("unavailable"));

        let (status, json) =
            json_request(app, Method::POST, "/plan", Some(json!({"prompt": "clean"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["detail"].as_str().unwrap().contains("Malformed"));
    }

    #[tokio::test]
    async fn planned_day_can_be_listed_and_completed() {
        let provider = Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o).reply(tasks_reply(
            json!([
                {"name": "Write blog", "description": "draft", "duration_minutes": 120, "priority": 2},
                {"name": "Meet a friend", "description": "coffee", "duration_minutes": 60, "priority": 1}
            ]),
        )));
        let app = app_with(vec![provider]);

        let (status, json) = json_request(
            app.clone(),
            Method::POST,
            "/api/plan",
            Some(json!({"prompt": "write a blog and meet a friend", "user_id": "user-1", "date": "2024-05-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
        assert_eq!(json["tasks"][0]["date"], "2024-05-01");

        let (status, json) = json_request(
            app.clone(),
            Method::GET,
            "/api/tasks?user_id=user-1&date=2024-05-01",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tasks"][0]["name"], "Meet a friend");
        let id = json["tasks"][0]["id"].as_str().unwrap().to_string();

        let (status, json) = json_request(
            app.clone(),
            Method::PATCH,
            &format!("/api/tasks/{}", id),
            Some(json!({"is_completed": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (_, json) = json_request(
            app,
            Method::GET,
            "/api/tasks?user_id=user-1&date=2024-05-01",
            None,
        )
        .await;
        assert_eq!(json["tasks"][0]["is_completed"], true);
    }

    #[tokio::test]
    async fn subtasks_for_unknown_task_are_500() {
        let provider = Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o).reply(
            json!({"subtasks": [{"name": "Outline", "description": "sections", "duration_minutes": 30}]})
                .to_string(),
        ));
        let app = app_with(vec![provider.clone()]);
        let task_id = "6f1c1f0e-8d7a-4b7e-9a53-2a1f0c6b7d11";

        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/generate-subtasks",
            Some(json!({
                "task_id": task_id,
                "name": "Write blog",
                "description": "Tech post",
                "duration_minutes": 30
            })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["detail"].as_str().unwrap().contains(task_id));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn patching_unknown_ids() {
        let app = app_with(vec![Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o))]);

        let (status, json) = json_request(
            app.clone(),
            Method::PATCH,
            "/api/subtasks/6f1c1f0e-8d7a-4b7e-9a53-2a1f0c6b7d11",
            Some(json!({"is_completed": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["detail"].as_str().unwrap().contains("not found"));

        let (status, _) = json_request(
            app,
            Method::PATCH,
            "/api/tasks/not-a-uuid",
            Some(json!({"is_completed": true})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = app_with(vec![Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o))]);

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/plan")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/plan")
            .header("origin", "http://evil.test")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }
}
