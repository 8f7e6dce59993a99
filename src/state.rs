use std::{sync::Arc, time::Duration};

use crate::{config::RelayConfig, metrics::AppMetrics};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub http: reqwest::Client,
    pub metrics: Arc<AppMetrics>,
}

impl AppState {
    /// The client carries a connect timeout only; total request time is
    /// unbounded because completion responses stream for as long as the
    /// upstream generates.
    pub fn new(config: RelayConfig) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|error| format!("failed to build upstream HTTP client: {error}"))?;

        Ok(Self {
            config: Arc::new(config),
            http,
            metrics: Arc::new(AppMetrics::new()),
        })
    }
}
