//! HTTP API for sitewright.
//!
//! Exposes the agent over a handful of JSON endpoints: trigger a build,
//! browse the generated files, and page through a finished run's message
//! log. Built on Axum.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use sitewright_agent::{SessionFactory, SessionOverrides};
use sitewright_core::message::{Conversation, Message};
use sitewright_tools::{ReadOutcome, SiteFsError};

/// Finished runs kept for `/messages`; the oldest is evicted beyond this.
const MAX_RUNS: usize = 256;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub sessions: SessionFactory,
    runs: RwLock<HashMap<String, Conversation>>,
}

impl GatewayState {
    pub fn new(sessions: SessionFactory) -> Self {
        Self {
            sessions,
            runs: RwLock::new(HashMap::new()),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/files", get(list_files_handler))
        .route("/files/{*path}", get(read_file_handler))
        .route("/generate", post(generate_handler))
        .route("/messages", get(messages_handler))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: sitewright_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let sessions = SessionFactory::from_config(config)?;
    let app = build_router(Arc::new(GatewayState::new(sessions)));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn site_error(e: SiteFsError) -> ApiError {
    match e {
        SiteFsError::Sandbox(e) => api_error(StatusCode::FORBIDDEN, e.to_string()),
        other => {
            error!(error = %other, "Site file access failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_files_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let site = state.sessions.site();
    let files = site.list_files(Some(site.output_dir())).await.map_err(site_error)?;
    Ok(Json(files))
}

/// Read a generated file. The path is anchored under the output directory.
async fn read_file_handler(
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<String, ApiError> {
    let site = state.sessions.site();
    match site.read_file(&site.anchor(&path)).await.map_err(site_error)? {
        ReadOutcome::Content(text) => Ok(text),
        ReadOutcome::NotFound(_) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("ERROR: file not found: {path}"),
        )),
    }
}

#[derive(Deserialize)]
struct GenerateRequest {
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    debug: bool,
}

#[derive(Serialize)]
struct GenerateResponse {
    status: &'static str,
    message: String,
    run_id: String,
    files: Vec<String>,
}

/// Run one build in a fresh session and report what was written.
///
/// Requests may pick a model but never the provider endpoint; the host
/// override stays with the CLI.
async fn generate_handler(
    State(state): State<SharedState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "prompt must not be empty"));
    }

    let run_id = uuid::Uuid::new_v4().simple().to_string();
    info!(run_id = %run_id, prompt_len = payload.prompt.len(), "Generate request");

    let overrides = SessionOverrides {
        model: payload.model,
        host: None,
        debug: payload.debug,
    };
    let mut agent = state
        .sessions
        .session_with(&overrides)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let message = agent.ask(&payload.prompt).await.map_err(|e| {
        error!(run_id = %run_id, error = %e, "Build failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let site = state.sessions.site();
    if let Err(e) = site
        .sync_static_assets(&state.sessions.config().workspace.static_dir)
        .await
    {
        warn!(run_id = %run_id, error = %e, "Copying static assets failed");
    }

    record_run(&state, &run_id, agent.conversation().clone()).await;

    let files = site.list_files(Some(site.output_dir())).await.map_err(site_error)?;
    Ok(Json(GenerateResponse {
        status: "ok",
        message,
        run_id,
        files,
    }))
}

async fn record_run(state: &GatewayState, run_id: &str, conversation: Conversation) {
    let mut runs = state.runs.write().await;
    if runs.len() >= MAX_RUNS {
        if let Some(oldest) = runs
            .iter()
            .min_by_key(|(_, c)| c.updated_at())
            .map(|(k, _)| k.clone())
        {
            runs.remove(&oldest);
        }
    }
    runs.insert(run_id.to_string(), conversation);
}

#[derive(Deserialize)]
struct MessagesQuery {
    run_id: String,
    #[serde(default)]
    cursor: i64,
}

#[derive(Serialize)]
struct MessagesResponse {
    run_id: String,
    cursor: usize,
    next_cursor: usize,
    messages: Vec<Message>,
}

/// Messages of a finished run from `cursor` onwards.
async fn messages_handler(
    State(state): State<SharedState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let cursor = usize::try_from(query.cursor)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "cursor must be >= 0"))?;

    let runs = state.runs.read().await;
    let run = runs
        .get(&query.run_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "run_id not found"))?;

    let messages = run.messages_since(cursor).to_vec();
    Ok(Json(MessagesResponse {
        next_cursor: cursor + messages.len(),
        run_id: query.run_id,
        cursor,
        messages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use sitewright_core::error::ProviderError;
    use sitewright_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct Scripted(Mutex<Vec<Value>>);

    #[async_trait::async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let mut replies = self.0.lock().unwrap();
            if replies.is_empty() {
                return Err(ProviderError::Network("script exhausted".into()));
            }
            Ok(ProviderResponse {
                raw: replies.remove(0),
                usage: None,
                model: request.model,
            })
        }
    }

    fn test_state(dir: &std::path::Path, replies: Vec<Value>) -> SharedState {
        let mut config = sitewright_config::AppConfig::default();
        config.workspace.project_root = dir.display().to_string();
        config.agent.system_prompt = Some("Build sites.".into());
        let sessions = SessionFactory::from_config(config)
            .unwrap()
            .with_provider(Arc::new(Scripted(Mutex::new(replies))));
        Arc::new(GatewayState::new(sessions))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path(), vec![]));

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn generate_then_browse_files_and_messages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/bootstrap.min.css"), "/* bs */").unwrap();

        let state = test_state(
            dir.path(),
            vec![
                json!({"message": {"content": "", "tool_calls": [{
                    "id": "call_1",
                    "function": {"name": "write_file", "arguments": {"path": "index.html", "content": "<h1>Hi</h1>"}}
                }]}}),
                json!({"message": {"content": "Your site is ready."}}),
            ],
        );
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json("/generate", json!({"prompt": "a one-page site"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["message"], "Your site is ready.");
        assert_eq!(body["files"], json!(["site/index.html", "site/static/bootstrap.min.css"]));
        let run_id = body["run_id"].as_str().unwrap().to_string();
        assert_eq!(run_id.len(), 32);

        let response = app.clone().oneshot(get("/files/index.html")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>Hi</h1>");

        let response = app
            .clone()
            .oneshot(get(&format!("/messages?run_id={run_id}&cursor=1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["cursor"], 1);
        // user, assistant with call, tool result, final assistant
        assert_eq!(page["next_cursor"], 5);
        assert_eq!(page["messages"][0]["role"], "user");
        assert_eq!(page["messages"][2]["tool_call_id"], "call_1");
    }

    #[tokio::test]
    async fn generate_ignores_host_in_request_body() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            dir.path(),
            vec![json!({"message": {"content": "Done."}})],
        );
        let app = build_router(state);

        let response = app
            .oneshot(post_json(
                "/generate",
                json!({"prompt": "a site", "host": "http://127.0.0.1:9", "model": "other"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Done.");
    }

    #[tokio::test]
    async fn messages_rejects_bad_cursor_and_unknown_run() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path(), vec![]));

        let response = app
            .clone()
            .oneshot(get("/messages?run_id=abc&cursor=-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(get("/messages?run_id=abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_and_escaping_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path(), vec![]));

        let response = app.clone().oneshot(get("/files/nope.html")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/files/..%2F..%2F..%2Fetc%2Fpasswd")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn generate_validates_prompt_and_reports_model_failure() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path(), vec![]));

        let response = app
            .clone()
            .oneshot(post_json("/generate", json!({"prompt": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json("/generate", json!({"prompt": "build"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].as_str().unwrap().contains("script exhausted"));
    }
}
