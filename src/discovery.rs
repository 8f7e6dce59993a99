use bytes::Bytes;
use futures_util::future::try_join_all;
use reqwest::{header::HeaderMap, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

use crate::{
    catalog::{self, ModelDescriptor},
    config::{BackendKind, RelayConfig},
    endpoint::{self, BackendTarget},
};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A target rejected the credentials. The upstream response is kept
    /// intact so the caller can relay it.
    #[error("upstream rejected the model listing credentials ({status})")]
    Unauthorized {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    #[error("model listing failed with status {status}")]
    Failed { status: StatusCode },
    #[error("model listing request failed: {0}")]
    Transport(String),
    #[error("model listing returned an invalid body: {0}")]
    InvalidBody(String),
}

/// Queries every discovery target and merges the known models into one list.
///
/// Targets are fetched concurrently but merged in target-declaration order,
/// and any single failure aborts the whole operation; a partial catalog is
/// never returned.
pub async fn list_models(
    client: &reqwest::Client,
    config: &RelayConfig,
    supplied_key: Option<&str>,
) -> Result<Vec<ModelDescriptor>, DiscoveryError> {
    let targets = endpoint::discovery_targets(config, supplied_key);
    let fetches = targets
        .iter()
        .map(|target| fetch_catalog(client, config, target));
    let merged = try_join_all(fetches).await?;
    Ok(merged.into_iter().flatten().collect())
}

async fn fetch_catalog(
    client: &reqwest::Client,
    config: &RelayConfig,
    target: &BackendTarget,
) -> Result<Vec<ModelDescriptor>, DiscoveryError> {
    let response = endpoint::authorize(client.get(&target.url), config, target)
        .send()
        .await
        .map_err(|error| DiscoveryError::Transport(error.to_string()))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        let headers = response.headers().clone();
        let body = response.bytes().await.unwrap_or_default();
        return Err(DiscoveryError::Unauthorized {
            status,
            headers,
            body,
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(
            %status,
            url = %target.url,
            body = %body.chars().take(400).collect::<String>(),
            "model listing failed"
        );
        return Err(DiscoveryError::Failed { status });
    }

    let listing: ModelListing = response
        .json()
        .await
        .map_err(|error| DiscoveryError::InvalidBody(error.to_string()))?;

    let mut models = Vec::new();
    for entry in listing.data {
        // The multi-region backend lists deployments whose base model sits
        // in a nested field; the direct backend identifies models by id.
        let identifier = match config.backend {
            BackendKind::Azure => entry.model.as_deref().unwrap_or_default(),
            BackendKind::OpenAi => entry.id.as_str(),
        };
        if let Some(card) = catalog::find_model(identifier) {
            models.push(card.descriptor_for(entry.id.clone()));
        }
    }
    Ok(models)
}

#[derive(Debug, Deserialize)]
struct ModelListing {
    #[serde(default)]
    data: Vec<ListedModel>,
}

#[derive(Debug, Deserialize)]
struct ListedModel {
    id: String,
    #[serde(default)]
    model: Option<String>,
}
