use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use super::{AnswerProvider, Metadata, ProviderError, ProviderResponse};
use crate::config::TeamServerConfig;

#[derive(Serialize)]
struct TeamRunInputs<'a> {
    query: &'a str,
}

#[derive(Serialize)]
struct TeamRunBody<'a> {
    team_id: &'a str,
    inputs: TeamRunInputs<'a>,
    metadata: &'a Metadata,
}

/// Remote team server reached over `POST {base_url}/v1/teams/run`.
pub struct TeamServerProvider {
    config: TeamServerConfig,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl TeamServerProvider {
    pub fn new(config: TeamServerConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            config,
            timeout,
            http_client,
        })
    }
}

#[async_trait]
impl AnswerProvider for TeamServerProvider {
    fn name(&self) -> &'static str {
        "team_server"
    }

    async fn answer(
        &self,
        query: &str,
        metadata: &Metadata,
    ) -> Result<ProviderResponse, ProviderError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or(ProviderError::ConfigurationMissing("TEAM_SERVER_BASE_URL"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::ConfigurationMissing("TEAM_SERVER_API_KEY"))?;
        let team_id = self
            .config
            .team_id
            .as_deref()
            .ok_or(ProviderError::ConfigurationMissing("TEAM_SERVER_TEAM_ID"))?;

        let url = format!("{}/v1/teams/run", base_url.trim_end_matches('/'));
        debug!("Team server: running team {} at {}", team_id, url);

        let body = TeamRunBody {
            team_id,
            inputs: TeamRunInputs { query },
            metadata,
        };

        let to_provider_error = |e| ProviderError::from_reqwest(e, self.timeout);

        let res = self
            .http_client
            .post(&url)
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(to_provider_error)?;

        res.json::<ProviderResponse>()
            .await
            .map_err(to_provider_error)
    }
}
