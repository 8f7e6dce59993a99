use crate::catalog::ModelFamily;
use crate::config::{BackendKind, RelayConfig};

/// One resolved upstream endpoint. Built per request, never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub url: String,
    pub credential: Option<String>,
}

/// Resolves the single completion endpoint for a model family. Resolution
/// always succeeds; a missing credential only surfaces once the upstream
/// rejects the call.
pub fn completion_target(
    config: &RelayConfig,
    family: ModelFamily,
    supplied_key: Option<&str>,
) -> BackendTarget {
    match config.backend {
        BackendKind::OpenAi => BackendTarget {
            url: format!("{}/v1/chat/completions", config.api_host),
            credential: pick_credential(supplied_key, None, config.api_key.as_deref()),
        },
        BackendKind::Azure => BackendTarget {
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                regional_host(config, family),
                regional_deployment(config, family),
                config.api_version,
            ),
            credential: pick_credential(
                supplied_key,
                regional_key(config, family),
                config.api_key.as_deref(),
            ),
        },
    }
}

/// Resolves the ordered set of model-listing endpoints: one for the direct
/// backend, one per region otherwise. Order is part of the contract; the
/// discovery merge preserves it.
pub fn discovery_targets(config: &RelayConfig, supplied_key: Option<&str>) -> Vec<BackendTarget> {
    match config.backend {
        BackendKind::OpenAi => vec![BackendTarget {
            url: format!("{}/v1/models", config.api_host),
            credential: pick_credential(supplied_key, None, config.api_key.as_deref()),
        }],
        BackendKind::Azure => [ModelFamily::Gpt35, ModelFamily::Gpt4]
            .into_iter()
            .map(|family| BackendTarget {
                url: format!(
                    "{}/openai/deployments?api-version={}",
                    regional_host(config, family),
                    config.api_version,
                ),
                credential: pick_credential(
                    supplied_key,
                    regional_key(config, family),
                    config.api_key.as_deref(),
                ),
            })
            .collect(),
    }
}

/// Attaches the mode's auth header shape: bearer token plus optional
/// organization header on the direct backend, `api-key` on the multi-region
/// backend.
pub fn authorize(
    builder: reqwest::RequestBuilder,
    config: &RelayConfig,
    target: &BackendTarget,
) -> reqwest::RequestBuilder {
    let credential = target.credential.as_deref().unwrap_or_default();
    match config.backend {
        BackendKind::OpenAi => {
            let builder = builder.bearer_auth(credential);
            match &config.organization {
                Some(organization) => builder.header("OpenAI-Organization", organization),
                None => builder,
            }
        }
        BackendKind::Azure => builder.header("api-key", credential),
    }
}

fn pick_credential(
    supplied: Option<&str>,
    regional: Option<&str>,
    primary: Option<&str>,
) -> Option<String> {
    supplied.or(regional).or(primary).map(ToOwned::to_owned)
}

fn regional_host(config: &RelayConfig, family: ModelFamily) -> &str {
    match family {
        ModelFamily::Gpt35 => config.api_host_gpt35.as_deref(),
        ModelFamily::Gpt4 => config.api_host_gpt4.as_deref(),
    }
    .unwrap_or(&config.api_host)
}

fn regional_key(config: &RelayConfig, family: ModelFamily) -> Option<&str> {
    match family {
        ModelFamily::Gpt35 => config.api_key_gpt35.as_deref(),
        ModelFamily::Gpt4 => config.api_key_gpt4.as_deref(),
    }
}

fn regional_deployment(config: &RelayConfig, family: ModelFamily) -> &str {
    match family {
        ModelFamily::Gpt35 => config.deployment_id_gpt35.as_deref(),
        ModelFamily::Gpt4 => config.deployment_id_gpt4.as_deref(),
    }
    .or(config.deployment_id.as_deref())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, RelayConfig};

    fn base_config(backend: BackendKind) -> RelayConfig {
        RelayConfig {
            backend,
            api_host: "https://primary.test".to_owned(),
            api_host_gpt35: Some("https://region3.test".to_owned()),
            api_host_gpt4: Some("https://region4.test".to_owned()),
            api_key: Some("primary-key".to_owned()),
            api_key_gpt35: Some("key-35".to_owned()),
            api_key_gpt4: Some("key-4".to_owned()),
            api_version: "2023-03-15-preview".to_owned(),
            organization: None,
            deployment_id: Some("shared-dep".to_owned()),
            deployment_id_gpt35: Some("dep-35".to_owned()),
            deployment_id_gpt4: Some("dep-4".to_owned()),
            connect_timeout_secs: 30,
        }
    }

    #[test]
    fn direct_completion_target_uses_fixed_path_and_primary_key() {
        let config = base_config(BackendKind::OpenAi);
        let target = completion_target(&config, ModelFamily::Gpt4, None);
        assert_eq!(target.url, "https://primary.test/v1/chat/completions");
        assert_eq!(target.credential.as_deref(), Some("primary-key"));
    }

    #[test]
    fn multi_region_routes_by_family() {
        let config = base_config(BackendKind::Azure);

        let cases = [
            (ModelFamily::Gpt35, "https://region3.test", "dep-35"),
            (ModelFamily::Gpt4, "https://region4.test", "dep-4"),
        ];
        for (family, host, deployment) in cases {
            let target = completion_target(&config, family, None);
            assert_eq!(
                target.url,
                format!(
                    "{host}/openai/deployments/{deployment}/chat/completions?api-version=2023-03-15-preview"
                )
            );
        }
    }

    #[test]
    fn unconfigured_regional_host_falls_back_to_primary() {
        let mut config = base_config(BackendKind::Azure);
        config.api_host_gpt4 = None;
        let target = completion_target(&config, ModelFamily::Gpt4, None);
        assert!(target.url.starts_with("https://primary.test/openai/deployments/dep-4/"));
    }

    #[test]
    fn unconfigured_regional_deployment_falls_back_to_shared() {
        let mut config = base_config(BackendKind::Azure);
        config.deployment_id_gpt35 = None;
        let target = completion_target(&config, ModelFamily::Gpt35, None);
        assert!(target.url.contains("/openai/deployments/shared-dep/"));
    }

    #[test]
    fn credential_precedence_is_supplied_then_regional_then_primary() {
        let config = base_config(BackendKind::Azure);

        let supplied = completion_target(&config, ModelFamily::Gpt35, Some("user-key"));
        assert_eq!(supplied.credential.as_deref(), Some("user-key"));

        let regional = completion_target(&config, ModelFamily::Gpt35, None);
        assert_eq!(regional.credential.as_deref(), Some("key-35"));

        let mut without_regional = base_config(BackendKind::Azure);
        without_regional.api_key_gpt35 = None;
        let primary = completion_target(&without_regional, ModelFamily::Gpt35, None);
        assert_eq!(primary.credential.as_deref(), Some("primary-key"));
    }

    #[test]
    fn direct_mode_ignores_regional_keys() {
        let config = base_config(BackendKind::OpenAi);
        let target = completion_target(&config, ModelFamily::Gpt35, None);
        assert_eq!(target.credential.as_deref(), Some("primary-key"));
    }

    #[test]
    fn direct_discovery_is_a_single_models_target() {
        let config = base_config(BackendKind::OpenAi);
        let targets = discovery_targets(&config, None);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].url, "https://primary.test/v1/models");
    }

    #[test]
    fn multi_region_discovery_lists_both_regions_in_order() {
        let config = base_config(BackendKind::Azure);
        let targets = discovery_targets(&config, None);
        assert_eq!(targets.len(), 2);
        assert_eq!(
            targets[0].url,
            "https://region3.test/openai/deployments?api-version=2023-03-15-preview"
        );
        assert_eq!(
            targets[1].url,
            "https://region4.test/openai/deployments?api-version=2023-03-15-preview"
        );
        assert_eq!(targets[0].credential.as_deref(), Some("key-35"));
        assert_eq!(targets[1].credential.as_deref(), Some("key-4"));
    }

    #[test]
    fn discovery_honors_supplied_key_for_every_target() {
        let config = base_config(BackendKind::Azure);
        let targets = discovery_targets(&config, Some("user-key"));
        assert!(targets
            .iter()
            .all(|target| target.credential.as_deref() == Some("user-key")));
    }
}
