//! Answer providers: anything that turns a question into an answer.

pub mod openai;
pub mod team_server;

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiProvider;
pub use team_server::TeamServerProvider;

/// Free-form string metadata forwarded alongside a query.
pub type Metadata = BTreeMap<String, String>;

/// Reply used when a provider answered with neither a response nor an error.
pub const UNKNOWN_FAILURE_TEXT: &str = "Sorry, something went wrong and no answer was produced.";

/// What a provider hands back. On the wire this is the team server's
/// `{"response": ..}` / `{"error": ..}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderResponse {
    pub fn success(answer: impl Into<String>) -> Self {
        Self {
            response: Some(answer.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(error.into()),
        }
    }

    /// Text to post back to the user. Never empty.
    pub fn into_reply_text(self) -> String {
        let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());

        non_empty(self.response)
            .or_else(|| non_empty(self.error))
            .unwrap_or_else(|| UNKNOWN_FAILURE_TEXT.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(&'static str),

    #[error("The answer provider did not respond within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Transport(reqwest::Error),
}

impl ProviderError {
    fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Transport(e)
        }
    }
}

#[async_trait]
pub trait AnswerProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn answer(
        &self,
        query: &str,
        metadata: &Metadata,
    ) -> Result<ProviderResponse, ProviderError>;
}
