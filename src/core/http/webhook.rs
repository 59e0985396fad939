//! Push webhook receiver.
//!
//! Authenticates every delivery against the shared secret, then runs a
//! build for pushes to the configured branch. The response is sent only
//! after the build finishes and is `200 OK` whether or not the build
//! succeeded; build failures are logged, not reported to the sender.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ShowcaseConfig;
use crate::error::Result;
use crate::pipeline::{self, PipelineMode, PipelineRunResult};
use crate::toolchain::ShellToolchain;
use crate::webhook::{self as auth, PushPayload, DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER};

/// Details of the push that caused a build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub delivery: Option<String>,
    pub git_ref: String,
    pub commit: Option<String>,
    pub repository: Option<String>,
}

/// Runs one build. Called on a blocking thread, never concurrently.
pub trait BuildTrigger: Send + Sync + 'static {
    fn run(&self, request: &BuildRequest) -> Result<PipelineRunResult>;
}

/// Production trigger: the local pipeline with real tools.
pub struct PipelineTrigger {
    config: ShowcaseConfig,
    toolchain: ShellToolchain,
}

impl PipelineTrigger {
    pub fn new(config: ShowcaseConfig) -> Self {
        Self {
            config,
            toolchain: ShellToolchain,
        }
    }
}

impl BuildTrigger for PipelineTrigger {
    fn run(&self, _request: &BuildRequest) -> Result<PipelineRunResult> {
        let plan = pipeline::plan(&self.config, PipelineMode::Local, None);
        pipeline::run(&plan, &self.toolchain)
    }
}

pub struct WebhookState {
    secret: String,
    branch: String,
    trigger: Arc<dyn BuildTrigger>,
    build_lock: Mutex<()>,
}

impl WebhookState {
    pub fn new(
        secret: impl Into<String>,
        branch: impl Into<String>,
        trigger: Arc<dyn BuildTrigger>,
    ) -> Self {
        Self {
            secret: secret.into(),
            branch: branch.into(),
            trigger,
            build_lock: Mutex::new(()),
        }
    }
}

pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(path, post(receive))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

async fn receive(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = header_str(&headers, DELIVERY_HEADER).map(str::to_string);

    if let Err(err) =
        auth::verify_signature(&state.secret, &body, header_str(&headers, SIGNATURE_HEADER))
    {
        warn!(
            delivery = delivery.as_deref().unwrap_or("-"),
            reason = err.details["reason"].as_str().unwrap_or("unknown"),
            "rejected webhook delivery"
        );
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    let payload = match PushPayload::parse(&body) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err.details, "webhook payload is not valid JSON");
            return (StatusCode::BAD_REQUEST, "Invalid payload").into_response();
        }
    };

    let event = header_str(&headers, EVENT_HEADER);
    if !auth::should_build(event, &payload, &state.branch) {
        info!(
            event = event.unwrap_or("-"),
            git_ref = payload.git_ref.as_deref().unwrap_or("-"),
            "ignoring delivery"
        );
        return (StatusCode::OK, "OK").into_response();
    }

    let request = BuildRequest {
        delivery,
        git_ref: payload.git_ref.clone().unwrap_or_default(),
        commit: payload.after.clone(),
        repository: payload.repository_name().map(str::to_string),
    };

    // One build at a time; later deliveries wait their turn.
    let _guard = state.build_lock.lock().await;
    info!(
        git_ref = %request.git_ref,
        commit = request.commit.as_deref().unwrap_or("-"),
        repository = request.repository.as_deref().unwrap_or("-"),
        "push received, starting build"
    );

    let trigger = Arc::clone(&state.trigger);
    match tokio::task::spawn_blocking(move || trigger.run(&request)).await {
        Ok(Ok(result)) => info!(
            run_id = %result.run_id,
            output = %result.output_path,
            "build succeeded"
        ),
        Ok(Err(err)) if err.code.is_pipeline_failure() => {
            error!(code = err.code.as_str(), error = %err, details = %err.details, "build failed")
        }
        Ok(Err(err)) => error!(code = err.code.as_str(), error = %err, "build could not run"),
        Err(join) => error!(error = %join, "build task aborted"),
    }

    (StatusCode::OK, "OK").into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
