use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{AnswerProvider, Metadata, ProviderError, ProviderResponse};
use crate::config::OpenAiConfig;

const SYSTEM_PROMPT: &str = "You are a QA assistant that provides recommendations, examples and \
instructions on how to use the codebase.\n\
Always answer the query using the provided context information, and not prior knowledge.\n\
Some rules to follow:\n\
1. Always include reference to a source of the information. \
Include numbered reference in square brackets in the answer text \
and list of used references by 'file_path' in the end.\n\
2. If asked for a code example, always include it in a code block ```python ... ```.";

#[derive(Serialize)]
struct OpenAIChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAIChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<OpenAIChatCompletionMessage<'a>>,
}

#[derive(Deserialize)]
struct ResChatCompletion {
    choices: Vec<ResChoice>,
}

#[derive(Deserialize)]
struct ResChoice {
    message: ResMessage,
}

#[derive(Deserialize)]
struct ResMessage {
    content: Option<String>,
}

/// Answers straight from an OpenAI-compatible chat completion endpoint.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            config,
            timeout,
            http_client,
        })
    }
}

#[async_trait]
impl AnswerProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn answer(
        &self,
        query: &str,
        metadata: &Metadata,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::ConfigurationMissing("OPENAI_API_KEY"))?;

        debug!(
            "OpenAI: asking {} (metadata = {:?})",
            self.config.model, metadata
        );

        let req_body = OpenAIChatCompletionBody {
            model: &self.config.model,
            messages: vec![
                OpenAIChatCompletionMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                OpenAIChatCompletionMessage {
                    role: "user",
                    content: query,
                },
            ],
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let to_provider_error = |e| ProviderError::from_reqwest(e, self.timeout);

        let res = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&req_body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(to_provider_error)?;

        let res_body = res
            .json::<ResChatCompletion>()
            .await
            .map_err(to_provider_error)?;

        // No choices means nothing usable came back; let the caller fall back.
        Ok(res_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| ProviderResponse::success(content.trim_start()))
            .unwrap_or_default())
    }
}
