//! Process-wide settings, read once at startup.

use std::{str::FromStr, time::Duration};

use log::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SLACK_API_BASE_URL: &str = "https://slack.com/api";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo-0125";
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_MAX_AGE: Duration = Duration::from_secs(60 * 5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not given")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    TeamServer,
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "team_server" | "teamserver" | "remote" => Ok(ProviderKind::TeamServer),
            "openai" => Ok(ProviderKind::OpenAi),
            _ => Err(()),
        }
    }
}

/// Team server settings. Every field may be absent; the provider reports
/// what is missing when it is asked for an answer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TeamServerConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub team_id: Option<String>,
}

impl std::fmt::Debug for TeamServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamServerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("team_id", &self.team_id)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub signing_secret: String,
    /// Resolved through `auth.test` when not given.
    pub bot_user_id: Option<String>,
    pub join_channel: Option<String>,
    pub slack_api_base_url: String,
    /// `None` turns off the request timestamp check.
    pub request_max_age: Option<Duration>,
    pub port: u16,
    pub provider: ProviderKind,
    pub provider_timeout: Duration,
    pub team_server: TeamServerConfig,
    pub openai: OpenAiConfig,
    #[cfg(feature = "use-ssl")]
    pub tls_cert_path: String,
    #[cfg(feature = "use-ssl")]
    pub tls_key_path: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("bot_user_id", &self.bot_user_id)
            .field("join_channel", &self.join_channel)
            .field("slack_api_base_url", &self.slack_api_base_url)
            .field("request_max_age", &self.request_max_age)
            .field("port", &self.port)
            .field("provider", &self.provider)
            .field("provider_timeout", &self.provider_timeout)
            .field("team_server", &self.team_server)
            .field("openai", &self.openai)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let parse_secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match get(key) {
                Some(val) => parse(key, &val).map(Duration::from_secs),
                None => Ok(default),
            }
        };

        let provider = match get("ANSWER_PROVIDER") {
            Some(val) => val.parse::<ProviderKind>().map_err(|_| ConfigError::Invalid {
                key: "ANSWER_PROVIDER",
                value: val.clone(),
            })?,
            None => ProviderKind::TeamServer,
        };

        let port = match get("PORT") {
            Some(val) => parse::<u16>("PORT", &val)?,
            None => DEFAULT_PORT,
        };

        let request_max_age = Some(parse_secs(
            "SLACK_REQUEST_MAX_AGE_SECS",
            DEFAULT_REQUEST_MAX_AGE,
        )?)
        .filter(|age| !age.is_zero());

        if request_max_age.is_none() {
            warn!("Slack request timestamp check is disabled");
        }

        Ok(Self {
            bot_token: require("SLACK_BOT_TOKEN")?,
            signing_secret: require("SLACK_SIGNING_SECRET")?,
            bot_user_id: get("SLACK_BOT_USER_ID"),
            join_channel: get("SLACK_JOIN_CHANNEL")
                .map(|name| name.trim_start_matches('#').to_string()),
            slack_api_base_url: get("SLACK_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE_URL.to_string()),
            request_max_age,
            port,
            provider,
            provider_timeout: parse_secs("PROVIDER_TIMEOUT_SECS", DEFAULT_PROVIDER_TIMEOUT)?,
            team_server: TeamServerConfig {
                base_url: get("TEAM_SERVER_BASE_URL"),
                api_key: get("TEAM_SERVER_API_KEY"),
                team_id: get("TEAM_SERVER_TEAM_ID"),
            },
            openai: OpenAiConfig {
                api_key: get("OPENAI_API_KEY"),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            },
            #[cfg(feature = "use-ssl")]
            tls_cert_path: get("TLS_CERT_PATH").unwrap_or_else(|| "PUBLIC_KEY.pem".to_string()),
            #[cfg(feature = "use-ssl")]
            tls_key_path: get("TLS_KEY_PATH").unwrap_or_else(|| "PRIVATE_KEY.pem".to_string()),
        })
    }
}

fn parse<T: FromStr>(key: &'static str, val: &str) -> Result<T, ConfigError> {
    val.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: val.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const SLACK: &[(&str, &str)] = &[
        ("SLACK_BOT_TOKEN", "xoxb-test"),
        ("SLACK_SIGNING_SECRET", "shh"),
    ];

    #[test]
    fn defaults_apply() {
        let config = config_from(SLACK).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.provider, ProviderKind::TeamServer);
        assert_eq!(config.provider_timeout, Duration::from_secs(60));
        assert_eq!(config.request_max_age, Some(Duration::from_secs(300)));
        assert_eq!(config.slack_api_base_url, "https://slack.com/api");
        assert_eq!(config.team_server, TeamServerConfig::default());
        assert_eq!(config.openai.model, "gpt-3.5-turbo-0125");
        assert_eq!(config.bot_user_id, None);
    }

    #[test]
    fn slack_credentials_are_required() {
        let err = config_from(&[("SLACK_SIGNING_SECRET", "shh")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SLACK_BOT_TOKEN")));

        let err = config_from(&[("SLACK_BOT_TOKEN", "xoxb"), ("SLACK_SIGNING_SECRET", " ")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SLACK_SIGNING_SECRET")));
    }

    #[test]
    fn overrides_are_read() {
        let mut pairs = SLACK.to_vec();
        pairs.extend_from_slice(&[
            ("PORT", "3000"),
            ("ANSWER_PROVIDER", "OpenAI"),
            ("PROVIDER_TIMEOUT_SECS", "5"),
            ("SLACK_REQUEST_MAX_AGE_SECS", "0"),
            ("SLACK_JOIN_CHANNEL", "#bot-testing"),
            ("TEAM_SERVER_BASE_URL", "http://localhost:8000"),
            ("TEAM_SERVER_API_KEY", "key"),
        ]);
        let config = config_from(&pairs).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.provider_timeout, Duration::from_secs(5));
        assert_eq!(config.request_max_age, None);
        assert_eq!(config.join_channel.as_deref(), Some("bot-testing"));
        assert_eq!(
            config.team_server.base_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.team_server.team_id, None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut pairs = SLACK.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            config_from(&pairs).unwrap_err(),
            ConfigError::Invalid { key: "PORT", .. }
        ));

        let mut pairs = SLACK.to_vec();
        pairs.push(("ANSWER_PROVIDER", "llama"));
        assert!(matches!(
            config_from(&pairs).unwrap_err(),
            ConfigError::Invalid {
                key: "ANSWER_PROVIDER",
                ..
            }
        ));
    }

    #[test]
    fn provider_names() {
        assert_eq!("Team_Server".parse::<ProviderKind>(), Ok(ProviderKind::TeamServer));
        assert_eq!("remote".parse::<ProviderKind>(), Ok(ProviderKind::TeamServer));
        assert_eq!("openai".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("local".parse::<ProviderKind>(), Err(()));
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let mut pairs = SLACK.to_vec();
        pairs.push(("TEAM_SERVER_API_KEY", "very-secret"));
        let dump = format!("{:?}", config_from(&pairs).unwrap());

        assert!(!dump.contains("xoxb-test"));
        assert!(!dump.contains("very-secret"));
    }
}
