use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{
    config::{BackendKind, RelayConfig},
    endpoint::{self, BackendTarget},
    models::{ChatMessage, CompletionSpec, MessageRole, MAX_COMPLETION_TOKENS},
    stream::{delta_stream, DeltaStream},
};

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Non-200 response carrying the structured error shape.
    #[error("{message}")]
    Api {
        message: String,
        kind: String,
        param: Option<String>,
        code: Option<String>,
    },
    /// Non-200 response without a parseable structured body.
    #[error("upstream returned an error ({status}): {detail}")]
    Http { status: StatusCode, detail: String },
    #[error("upstream request failed: {0}")]
    Transport(String),
}

/// Issues the completion call for `spec` and returns the relay's outgoing
/// delta byte stream. Exactly one backend target is used per call.
pub async fn open_completion_stream(
    client: &reqwest::Client,
    config: &RelayConfig,
    spec: &CompletionSpec,
    supplied_key: Option<&str>,
) -> Result<DeltaStream, UpstreamError> {
    let target = endpoint::completion_target(config, spec.family, supplied_key);
    let response = send_completion(client, config, spec, &target).await?;
    debug!(url = %target.url, "completion stream opened");
    Ok(delta_stream(response.bytes_stream()))
}

async fn send_completion(
    client: &reqwest::Client,
    config: &RelayConfig,
    spec: &CompletionSpec,
    target: &BackendTarget,
) -> Result<reqwest::Response, UpstreamError> {
    let mut payload = json!({
        "messages": wire_messages(spec),
        "max_tokens": MAX_COMPLETION_TOKENS,
        "temperature": spec.temperature,
        "stream": true,
    });
    // The direct backend selects the model in the body; the multi-region
    // backend selects it through the deployment path.
    if config.backend == BackendKind::OpenAi {
        payload["model"] = json!(spec.model_id);
    }

    let response = endpoint::authorize(client.post(&target.url), config, target)
        .json(&payload)
        .send()
        .await
        .map_err(|error| UpstreamError::Transport(error.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(error_from_response(status, response).await)
}

fn wire_messages(spec: &CompletionSpec) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(spec.messages.len() + 1);
    messages.push(ChatMessage {
        role: MessageRole::System,
        content: spec.system_prompt.clone(),
    });
    messages.extend(spec.messages.iter().cloned());
    messages
}

async fn error_from_response(status: StatusCode, response: reqwest::Response) -> UpstreamError {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<UpstreamErrorEnvelope>(&body) {
        Ok(envelope) => UpstreamError::Api {
            message: envelope.error.message,
            kind: envelope.error.kind,
            param: envelope.error.param,
            code: envelope.error.code,
        },
        Err(_) => {
            let detail = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown upstream failure")
                    .to_owned()
            } else {
                body.chars().take(400).collect()
            };
            UpstreamError::Http { status, detail }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorEnvelope {
    error: UpstreamErrorBody,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    code: Option<String>,
}
