// service neutral message

use crate::slack::Block;

/// One message notification, detached from the callback envelope it came in.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub user: Option<String>,
    pub channel: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    /// Absent for plain-text messages; mentions only ever arrive in rich text.
    pub blocks: Option<Vec<Block>>,
}

impl MessageEvent {
    /// Thread a reply belongs to: the enclosing thread, or the message itself
    /// when it was posted at the channel root.
    pub fn thread_id(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// A message addressed to the bot, reduced to what the answer path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub query: String,
    pub thread_id: String,
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertMessageEventError {
    #[error("event is not a message")]
    InvalidMessageType,
}
