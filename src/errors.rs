use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{discovery::DiscoveryError, upstream::UpstreamError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Upstream(error) => upstream_error_response(error),
            AppError::Discovery(error) => discovery_error_response(error),
            AppError::Internal(message) => {
                make_error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error", message)
            }
        }
    }
}

fn upstream_error_response(error: UpstreamError) -> Response {
    match error {
        UpstreamError::Api { message, kind, .. } => {
            let error_type = if kind.is_empty() {
                "upstream_error".to_owned()
            } else {
                kind
            };
            make_error_response(StatusCode::INTERNAL_SERVER_ERROR, &error_type, message)
        }
        other => make_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "upstream_error",
            other.to_string(),
        ),
    }
}

fn discovery_error_response(error: DiscoveryError) -> Response {
    match error {
        // An upstream 401 is relayed with its own headers and body, behind
        // the relay's own failure status.
        DiscoveryError::Unauthorized { headers, body, .. } => {
            let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Body::from(body)).into_response();
            let outgoing = response.headers_mut();
            outgoing.remove(header::CONTENT_TYPE);
            for (name, value) in headers.iter() {
                if name == header::CONTENT_LENGTH
                    || name == header::TRANSFER_ENCODING
                    || name == header::CONNECTION
                {
                    continue;
                }
                outgoing.append(name.clone(), value.clone());
            }
            response
        }
        other => make_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "upstream_error",
            other.to_string(),
        ),
    }
}

fn make_error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    let payload = ErrorEnvelope {
        error: ErrorBody {
            message,
            error_type: error_type.to_owned(),
        },
    };

    (status, Json(payload)).into_response()
}

pub fn apply_header(headers: &mut axum::http::HeaderMap, name: &str, value: &str) {
    let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
        return;
    };
    let Ok(header_value) = HeaderValue::from_str(value) else {
        return;
    };
    headers.insert(header_name, header_value);
}
