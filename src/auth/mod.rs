use std::{
    marker::PhantomData,
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::{
    body::{Body, BoxBody, HttpBody},
    http::{Request, Response, StatusCode},
};
use bytes::Buf;
use futures::future::BoxFuture;
use hmac::Mac;
use log::{debug, error, warn};

/// Event payloads are a few kilobytes; anything past this is refused unread.
pub const MAX_BODY_BYTES: usize = 1 << 20;

struct ByteBuf<'a>(&'a [u8]);

impl<'a> std::fmt::LowerHex for ByteBuf<'a> {
    fn fmt(&self, fmtr: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        for byte in self.0 {
            fmtr.write_fmt(format_args!("{:02x}", byte))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Verifier {
    secret: Vec<u8>,
    max_age: Option<Duration>,
}

/// Checks `X-Slack-Signature` against the signing secret before a request
/// reaches the event endpoint.
///
/// https://api.slack.com/authentication/verifying-requests-from-slack
#[derive(Debug)]
pub struct SlackAuthorization<BOut>(Arc<Verifier>, PhantomData<BOut>);

impl<BOut> Clone for SlackAuthorization<BOut> {
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<BOut> SlackAuthorization<BOut> {
    /// `max_age` bounds how far the request timestamp may drift from now.
    /// `None` accepts any timestamp.
    pub fn new(secret: Vec<u8>, max_age: Option<Duration>) -> Self {
        Self(Arc::new(Verifier { secret, max_age }), PhantomData)
    }
}

pub trait FromBody {
    fn from_body(body: Body) -> Self;
}

impl FromBody for Body {
    fn from_body(body: Body) -> Self {
        body
    }
}

impl FromBody for BoxBody {
    fn from_body(body: Body) -> Self {
        axum::body::boxed(body)
    }
}

fn empty_response<BOut>(status_code: StatusCode) -> Response<BOut>
where
    BOut: FromBody,
{
    let mut res = Response::new(FromBody::from_body(Body::empty()));
    *res.status_mut() = status_code;
    res
}

fn is_stale(timestamp: u64, max_age: Duration) -> bool {
    let Some(sent) = SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(timestamp)) else {
        return true;
    };
    let now = SystemTime::now();

    let drift = match now.duration_since(sent) {
        Ok(age) => age,
        Err(e) => e.duration(),
    };

    drift > max_age
}

async fn impl_authorize<BIn, BOut>(
    verifier: Arc<Verifier>,
    request: Request<BIn>,
) -> Result<Request<BOut>, Response<BOut>>
where
    BIn: axum::body::HttpBody + Unpin + Send + Sync + 'static,
    BOut: FromBody,
    <BIn as axum::body::HttpBody>::Error: std::fmt::Display,
{
    let (parts, mut body) = request.into_parts();

    let timestamp = parts
        .headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|t| t.to_str().ok())
        .ok_or_else(|| empty_response(StatusCode::BAD_REQUEST))?;

    let signature = parts
        .headers
        .get("X-Slack-Signature")
        .and_then(|s| s.to_str().ok())
        .ok_or_else(|| empty_response(StatusCode::BAD_REQUEST))?;

    if let Some(max_age) = verifier.max_age {
        let sent = timestamp
            .parse::<u64>()
            .map_err(|_| empty_response(StatusCode::BAD_REQUEST))?;

        if is_stale(sent, max_age) {
            warn!("Rejecting slack request with stale timestamp {}", timestamp);
            return Err(empty_response(StatusCode::BAD_REQUEST));
        }
    }

    let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(&verifier.secret)
        .map_err(|_| empty_response(StatusCode::INTERNAL_SERVER_ERROR))?;
    mac.update("v0:".as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(":".as_bytes());

    let mut bytes = Vec::new();
    while let Some(chunk) = body.data().await {
        match chunk {
            Ok(chunk) => {
                let chunk = chunk.chunk();
                if bytes.len() + chunk.len() > MAX_BODY_BYTES {
                    warn!("Slack request body exceeds {} bytes", MAX_BODY_BYTES);
                    return Err(empty_response(StatusCode::PAYLOAD_TOO_LARGE));
                }
                mac.update(chunk);
                bytes.extend_from_slice(chunk);
            }
            Err(e) => {
                error!("Failed to read http request body - {}", e);
                return Err(empty_response(StatusCode::BAD_REQUEST));
            }
        }
    }

    let calculated_signature = format!("v0={:02x}", ByteBuf(&mac.finalize().into_bytes()));

    if signature != calculated_signature {
        warn!("Slack signature mismatch");
        return Err(empty_response(StatusCode::BAD_REQUEST));
    }

    debug!("Success to verify a slack's signature.");

    Ok(Request::from_parts(parts, FromBody::from_body(bytes.into())))
}

type SlackAuthorizationFuture<BOut> = BoxFuture<'static, Result<Request<BOut>, Response<BOut>>>;

impl<BIn, BOut> tower_http::auth::AsyncAuthorizeRequest<BIn> for SlackAuthorization<BOut>
where
    BIn: axum::body::HttpBody + Unpin + Send + Sync + 'static,
    BOut: FromBody,
    <BIn as axum::body::HttpBody>::Error: std::fmt::Display,
{
    type RequestBody = BOut;
    type ResponseBody = BOut;
    type Future = SlackAuthorizationFuture<BOut>;

    fn authorize(&mut self, request: Request<BIn>) -> Self::Future {
        let verifier = self.0.clone();
        Box::pin(async move { impl_authorize::<BIn, BOut>(verifier, request).await })
    }
}
