mod protocol;
#[cfg(test)]
mod test;

pub use protocol::*;

use std::{convert::TryFrom, sync::Arc};

use axum::{
    body::BoxBody,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use log::{debug, error, warn};

use crate::{
    bot::Bot,
    dispatch,
    message::{ConvertMessageEventError, MessageEvent},
};

impl TryFrom<&InternalEvent> for MessageEvent {
    type Error = ConvertMessageEventError;

    fn try_from(val: &InternalEvent) -> std::result::Result<Self, Self::Error> {
        match val {
            InternalEvent::Message(msg) => Ok(Self {
                user: msg.user.clone(),
                channel: msg.channel.clone(),
                ts: String::from(&msg.ts),
                thread_ts: msg.thread_ts.as_ref().map(String::from),
                blocks: msg.blocks.clone(),
            }),
            InternalEvent::Unsupported => Err(ConvertMessageEventError::InvalidMessageType),
        }
    }
}

pub enum HttpResponse {
    Challenge(serde_json::Value),
    Ok,
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        match self {
            HttpResponse::Challenge(challenge) => (
                StatusCode::OK,
                Json(ChallengeResponse {
                    challenge: &challenge,
                }),
            )
                .into_response(),
            HttpResponse::Ok => StatusCode::OK.into_response(),
        }
    }
}

pub async fn http_handler<B: Bot + 'static>(
    Extension(bot): Extension<Arc<B>>,
    Json(request): Json<SlackRequest>,
) -> HttpResponse {
    debug!("Parsed Request: {:?}", request);

    match request {
        SlackRequest::Challenge { challenge } => HttpResponse::Challenge(challenge),
        SlackRequest::Event(SlackEvent::EventCallback(event_callback)) => {
            match MessageEvent::try_from(&event_callback.event) {
                Ok(msg) => {
                    tokio::task::spawn(async move {
                        if let Err(e) = dispatch::handle_message_event(bot.as_ref(), msg).await {
                            error!("Error occured while handling slack event - {:?}", e);
                        }
                    });
                }
                Err(e) => {
                    debug!(
                        "Skipping event {} - {}",
                        event_callback.event_id, e
                    );
                }
            }
            HttpResponse::Ok
        }
        SlackRequest::Unrecognized(value) => {
            warn!(
                "Unrecognized request of type {}",
                value.get("type").and_then(|ty| ty.as_str()).unwrap_or("?")
            );
            HttpResponse::Ok
        }
    }
}

/// Event endpoint, before request signatures are checked.
pub fn router<B: Bot + 'static>(bot: Arc<B>) -> Router<(), BoxBody> {
    Router::new()
        .route("/", post(http_handler::<B>))
        .layer(Extension(bot))
}
