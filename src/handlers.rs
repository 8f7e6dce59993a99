use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    discovery,
    errors::{apply_header, AppError},
    models::{ChatStreamRequest, ModelListRequest},
    state::AppState,
    upstream,
};

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(error) => AppError::Internal(format!("metrics render failed: {error}")).into_response(),
    }
}

pub async fn models(
    State(state): State<AppState>,
    Json(request): Json<ModelListRequest>,
) -> Response {
    let started = Instant::now();
    let _inflight = state.metrics.inflight_guard();

    let response =
        match discovery::list_models(&state.http, &state.config, request.key.as_deref()).await {
            Ok(catalog) => {
                info!(models = catalog.len(), "model catalog assembled");
                Json(catalog).into_response()
            }
            Err(error) => {
                state.metrics.observe_upstream_error("discovery");
                warn!(error = %error, "model discovery failed");
                AppError::from(error).into_response()
            }
        };

    state.metrics.observe_request(
        "/api/models",
        "POST",
        response.status().as_u16(),
        started.elapsed(),
    );

    response
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatStreamRequest>,
) -> Response {
    let started = Instant::now();
    let _inflight = state.metrics.inflight_guard();

    let response = match open_chat_stream(&state, request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    };

    state.metrics.observe_request(
        "/api/chat",
        "POST",
        response.status().as_u16(),
        started.elapsed(),
    );

    response
}

async fn open_chat_stream(
    state: &AppState,
    request: ChatStreamRequest,
) -> Result<Response, AppError> {
    let request_id = format!("req_{}", Uuid::new_v4());
    let supplied_key = request.key.clone();
    let spec = request.into_spec();
    info!(
        request_id = %request_id,
        model = %spec.model_id,
        family = ?spec.family,
        temperature = spec.temperature,
        messages = spec.messages.len(),
        "chat stream accepted"
    );

    let stream =
        upstream::open_completion_stream(&state.http, &state.config, &spec, supplied_key.as_deref())
            .await
            .map_err(|error| {
                state.metrics.observe_upstream_error("completion");
                warn!(request_id = %request_id, error = %error, "completion call failed");
                error
            })?;

    let metrics = state.metrics.clone();
    let observed = stream.map(move |item| {
        if let Err(error) = &item {
            metrics.observe_upstream_error("stream");
            warn!(request_id = %request_id, error = %error, "completion stream failed");
        }
        item
    });

    let mut response = Body::from_stream(observed).into_response();
    apply_header(
        response.headers_mut(),
        "content-type",
        "text/plain; charset=utf-8",
    );
    Ok(response)
}
