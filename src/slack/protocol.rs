use std::{
    fmt::{Debug, Formatter},
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StrTimeStamp(String);

impl StrTimeStamp {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&StrTimeStamp> for SystemTime {
    fn from(val: &StrTimeStamp) -> SystemTime {
        let secs = val
            .0
            .parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_default();

        SystemTime::UNIX_EPOCH + secs
    }
}

impl From<&StrTimeStamp> for String {
    fn from(val: &StrTimeStamp) -> Self {
        val.0.clone()
    }
}

impl Debug for StrTimeStamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let t: SystemTime = self.into();
        write!(f, "{}({:?})", self.0, t)
    }
}

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct NumericTimeStamp(u64);

impl From<&NumericTimeStamp> for SystemTime {
    fn from(val: &NumericTimeStamp) -> SystemTime {
        SystemTime::UNIX_EPOCH
            .checked_add(Duration::from_secs(val.0))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

impl Debug for NumericTimeStamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let t: SystemTime = self.into();
        write!(f, "{}({:?})", self.0, t)
    }
}

/// Inline element of a rich text section.
///
/// Only mentions and plain text matter for routing; emoji, links, channel
/// references and the like all land in `Unsupported`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum RichTextElement {
    User {
        user_id: String,
    },
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

/// One child of a `rich_text` block (`rich_text_section`, `rich_text_quote`, ...).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RichTextSection {
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub elements: Option<Vec<RichTextElement>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Block {
    RichText {
        block_id: Option<String>,
        elements: Option<Vec<RichTextSection>>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasicMessage {
    pub subtype: Option<String>,
    pub channel: String,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub text: Option<String>,
    pub ts: StrTimeStamp,
    pub thread_ts: Option<StrTimeStamp>,
    pub event_ts: Option<String>,
    pub blocks: Option<Vec<Block>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum InternalEvent {
    Message(Box<BasicMessage>),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventCallback {
    pub api_app_id: Option<String>,
    pub authed_users: Option<Vec<String>>,
    pub event: InternalEvent,
    pub event_id: String,
    pub event_time: NumericTimeStamp,
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum SlackEvent {
    EventCallback(Box<EventCallback>),
}

/// Body of a request posted to the events endpoint.
///
/// https://api.slack.com/events/url_verification
///
/// Any body carrying a `challenge` is a handshake and must be answered with
/// HTTP 200 OK
/// Content-type: application/json
/// {"challenge": "SOME_VALUE"}
///
/// The value is echoed back as-is, whatever its JSON type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SlackRequest {
    Challenge { challenge: serde_json::Value },
    Event(SlackEvent),
    Unrecognized(serde_json::Value),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeResponse<'a> {
    pub challenge: &'a serde_json::Value,
}

/**
 * Sent from client.
 */

#[derive(Debug, Clone, Serialize)]
pub struct PostMessage<'a> {
    pub channel: &'a str,

    pub text: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unfurl_links: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinConversation<'a> {
    pub channel: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PostMessageResponse {
    pub ok: bool,
    pub channel: Option<String>,
    pub ts: Option<StrTimeStamp>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTestResponse {
    pub ok: bool,
    pub user_id: Option<String>,
    pub user: Option<String>,
    pub team: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: Option<String>,
    pub is_member: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMetadata {
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationsListResponse {
    pub ok: bool,
    pub channels: Option<Vec<Channel>>,
    pub error: Option<String>,
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationsJoinResponse {
    pub ok: bool,
    pub channel: Option<Channel>,
    pub error: Option<String>,
}
