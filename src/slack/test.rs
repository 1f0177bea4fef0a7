use super::*;

use axum::{
    body::{Body, HttpBody},
    http::Request,
};
use tower::ServiceExt;

use crate::test::{MockBot, SentMessage};

const MENTION_CALLBACK: &str = r#"{
    "token": "XXYYZZ",
    "team_id": "T123ABC456",
    "api_app_id": "A123ABC456",
    "event": {
        "type": "message",
        "channel": "C123ABC456",
        "user": "U123ABC456",
        "text": "<@UBOT> how do I build this?",
        "ts": "1355517523.000005",
        "event_ts": "1355517523.000005",
        "channel_type": "channel",
        "blocks": [
            {
                "type": "rich_text",
                "block_id": "Xg7a",
                "elements": [
                    {
                        "type": "rich_text_section",
                        "elements": [
                            { "type": "user", "user_id": "UBOT" },
                            { "type": "text", "text": " how do I build this?" }
                        ]
                    }
                ]
            }
        ]
    },
    "type": "event_callback",
    "authed_users": ["UBOT"],
    "event_id": "Ev123ABC456",
    "event_time": 1355517523
}"#;

fn callback_event(body: &str) -> InternalEvent {
    match serde_json::from_str::<SlackRequest>(body).unwrap() {
        SlackRequest::Event(SlackEvent::EventCallback(callback)) => callback.event,
        other => panic!("expected an event callback, got {:?}", other),
    }
}

#[test]
pub fn test_deserialize_mention_callback() {
    let event = callback_event(MENTION_CALLBACK);
    let msg = MessageEvent::try_from(&event).unwrap();

    assert_eq!(msg.channel, "C123ABC456");
    assert_eq!(msg.ts, "1355517523.000005");
    assert_eq!(msg.thread_ts, None);
    assert_eq!(
        msg.blocks,
        Some(vec![Block::RichText {
            block_id: Some("Xg7a".to_string()),
            elements: Some(vec![RichTextSection {
                ty: Some("rich_text_section".to_string()),
                elements: Some(vec![
                    RichTextElement::User {
                        user_id: "UBOT".to_string()
                    },
                    RichTextElement::Text {
                        text: " how do I build this?".to_string()
                    },
                ]),
            }]),
        }])
    );
}

#[test]
pub fn test_deserialize_basic_message() {
    let event = callback_event(
        r#"{
        "type": "event_callback",
        "event_id": "Ev1",
        "event_time": 1355517523,
        "event": {
            "type": "message",
            "channel": "C2147483705",
            "user": "U2147483697",
            "text": "Hello world",
            "ts": "1355517523.000005",
            "thread_ts": "1355517500.000001"
        }
    }"#,
    );
    let msg = MessageEvent::try_from(&event).unwrap();

    assert!(msg.blocks.is_none());
    assert_eq!(msg.thread_ts.as_deref(), Some("1355517500.000001"));
}

#[test]
pub fn test_unknown_blocks_and_elements_are_tolerated() {
    let event = callback_event(
        r#"{
        "type": "event_callback",
        "event_id": "Ev1",
        "event_time": 1355517523,
        "event": {
            "type": "message",
            "channel": "C1",
            "ts": "1355517523.000005",
            "blocks": [
                { "type": "section", "text": { "type": "mrkdwn", "text": "hi" } },
                { "type": "rich_text", "block_id": "a" },
                {
                    "type": "rich_text",
                    "elements": [
                        { "type": "rich_text_list", "style": "bullet", "elements": [
                            { "type": "rich_text_section", "elements": [] }
                        ] },
                        { "type": "rich_text_section", "elements": [
                            { "type": "emoji", "name": "wave" },
                            { "type": "link", "url": "https://example.com" },
                            { "type": "text", "text": "bold", "style": { "bold": true } }
                        ] }
                    ]
                }
            ]
        }
    }"#,
    );
    let msg = MessageEvent::try_from(&event).unwrap();
    let blocks = msg.blocks.unwrap();

    assert_eq!(blocks[0], Block::Unsupported);
    assert_eq!(
        blocks[1],
        Block::RichText {
            block_id: Some("a".to_string()),
            elements: None,
        }
    );
    match &blocks[2] {
        Block::RichText {
            elements: Some(sections),
            ..
        } => {
            assert_eq!(
                sections[0].elements,
                Some(vec![RichTextElement::Unsupported])
            );
            assert_eq!(
                sections[1].elements,
                Some(vec![
                    RichTextElement::Unsupported,
                    RichTextElement::Unsupported,
                    RichTextElement::Text {
                        text: "bold".to_string()
                    },
                ])
            );
        }
        other => panic!("expected rich text, got {:?}", other),
    }
}

#[test]
pub fn test_non_message_events_are_not_converted() {
    let event = callback_event(
        r#"{
        "type": "event_callback",
        "event_id": "Ev1",
        "event_time": 1355517523,
        "event": { "type": "reaction_added", "user": "U1", "reaction": "thumbsup" }
    }"#,
    );

    assert!(MessageEvent::try_from(&event).is_err());
}

#[test]
pub fn test_any_body_with_challenge_is_a_handshake() {
    let request = serde_json::from_str::<SlackRequest>(
        r#"{ "token": "T", "challenge": "abc123", "type": "url_verification" }"#,
    )
    .unwrap();
    assert!(matches!(request, SlackRequest::Challenge { challenge } if challenge == "abc123"));

    let request = serde_json::from_str::<SlackRequest>(r#"{ "challenge": "abc123" }"#).unwrap();
    assert!(matches!(request, SlackRequest::Challenge { .. }));

    let request = serde_json::from_str::<SlackRequest>(r#"{ "type": "app_rate_limited" }"#).unwrap();
    assert!(matches!(request, SlackRequest::Unrecognized(_)));
}

#[test]
pub fn test_timestamp_debug_shows_time() {
    let ts: StrTimeStamp = serde_json::from_str(r#""1355517523.000005""#).unwrap();
    assert!(format!("{:?}", ts).starts_with("1355517523.000005("));

    let garbage: StrTimeStamp = serde_json::from_str(r#""not-a-number""#).unwrap();
    assert!(format!("{:?}", garbage).starts_with("not-a-number("));

    let far: NumericTimeStamp = serde_json::from_str(&u64::MAX.to_string()).unwrap();
    assert!(format!("{:?}", far).starts_with(&format!("{}(", u64::MAX)));
}

fn json_request(body: &str) -> Request<BoxBody> {
    Request::post("/")
        .header("Content-Type", "application/json")
        .body(axum::body::boxed(Body::from(body.to_string())))
        .unwrap()
}

async fn body_string(mut res: Response) -> String {
    let mut body = Vec::new();
    while let Some(chunk) = res.body_mut().data().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    String::from_utf8(body).unwrap()
}

#[tokio::test]
async fn challenge_is_echoed_and_not_routed() {
    let bot = Arc::new(MockBot::answering("hello"));

    let res = router(bot.clone())
        .oneshot(json_request(r#"{"challenge": "abc123"}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("Content-Type").unwrap().to_str().unwrap(),
        "application/json"
    );
    let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
    assert_eq!(body, serde_json::json!({ "challenge": "abc123" }));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(bot.dump_messages().unwrap().is_empty());
    assert!(bot.provider.queries().is_empty());
}

#[tokio::test]
async fn non_string_challenge_is_echoed_unchanged() {
    let bot = Arc::new(MockBot::answering("hello"));

    let res = router(bot)
        .oneshot(json_request(r#"{"challenge": 12345}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
    assert_eq!(body, serde_json::json!({ "challenge": 12345 }));
}

#[tokio::test]
async fn mention_is_answered_in_thread() {
    let bot = Arc::new(MockBot::answering("run cargo build"));

    let res = router(bot.clone())
        .oneshot(json_request(MENTION_CALLBACK))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // the answer is posted from a spawned task
    let mut sent = Vec::new();
    for _ in 0..100 {
        sent.extend(bot.dump_messages().unwrap());
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    assert_eq!(
        sent,
        vec![SentMessage {
            channel: "C123ABC456".to_string(),
            text: "run cargo build".to_string(),
            thread_ts: Some("1355517523.000005".to_string()),
        }]
    );
    assert_eq!(bot.provider.queries()[0].0, " how do I build this?");
}

#[tokio::test]
async fn unrecognized_payloads_are_acknowledged() {
    let bot = Arc::new(MockBot::answering("hello"));

    let res = router(bot.clone())
        .oneshot(json_request(r#"{"type": "app_rate_limited", "minute_rate_limited": 1518467820}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(bot.provider.queries().is_empty());
}

#[tokio::test]
async fn signed_requests_pass_verification() {
    use crate::auth::SlackAuthorization;
    use hmac::Mac;
    use tower_http::auth::AsyncRequireAuthorizationLayer;

    const SECRET: &str = "signing-secret";

    let bot = Arc::new(MockBot::answering("hello"));
    let app: Router<(), Body> = router(bot).layer(AsyncRequireAuthorizationLayer::new(
        SlackAuthorization::<BoxBody>::new(
            SECRET.as_bytes().to_vec(),
            Some(std::time::Duration::from_secs(300)),
        ),
    ));

    let body = r#"{"token":"T","challenge":"signed","type":"url_verification"}"#;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .to_string();

    let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("v0:{}:{}", timestamp, body).as_bytes());
    let signature = format!(
        "v0={}",
        mac.finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    );

    let signed = Request::post("/")
        .header("Content-Type", "application/json")
        .header("X-Slack-Request-Timestamp", &timestamp)
        .header("X-Slack-Signature", &signature)
        .body(Body::from(body))
        .unwrap();
    let res = app.clone().oneshot(signed).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let echoed: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
    assert_eq!(echoed["challenge"], "signed");

    let unsigned = Request::post("/")
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let res = app.oneshot(unsigned).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
