//! HTTP transport for the filtered-stream endpoint.

use crate::framing::{Frame, LengthDelimitedFramer};
use crate::oauth::{percent_encode, OAuthSigner};
use crate::transport::{InboundStream, InboundUnit, StreamTransport};
use crate::FilterSpec;
use async_trait::async_trait;
use credential_store::CredentialSet;
use futures_util::{stream, StreamExt};
use reconnect_policy::TransportError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_STREAM_URL: &str = "https://stream.twitter.com/1.1/statuses/filter.json";
pub const DEFAULT_USER_AGENT: &str = concat!("twgrabber ", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a [`TransportError`] message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            connect_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Opens `POST track=...&delimited=length` streams signed with OAuth 1.0a.
pub struct HttpStreamTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpStreamTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        // No overall timeout: the response body is open-ended. Stalls are detected by the session.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn connect(
        &mut self,
        credentials: &CredentialSet,
        filter: &FilterSpec,
    ) -> Result<InboundStream, TransportError> {
        let track = filter.track_param();
        let params = [("delimited", "length"), ("track", track.as_str())];
        let authorization =
            OAuthSigner::new(credentials).authorization("POST", &self.config.url, &params)?;
        let body = form_body(&params);

        debug!(url = %self.config.url, keywords = filter.keywords().len(), "Opening stream");
        let response = self
            .client
            .post(&self.config.url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error = error_from_response(response).await;
            warn!(status = status.as_u16(), error = %error, "Stream request failed");
            return Err(error);
        }

        info!(status = status.as_u16(), "Stream connected");
        Ok(frame_body(response))
    }
}

/// Form-encode with the same escaping used for the signature base string.
fn form_body(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

async fn error_from_response(response: Response) -> TransportError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    TransportError::from_status(status, message.trim(), retry_after)
}

/// Only the delta-seconds form is honored; HTTP dates are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

struct BodyState<S> {
    body: S,
    framer: LengthDelimitedFramer,
    done: bool,
}

/// Turn the response body into inbound units. A body error or framing error
/// is emitted once as a signal, after which the stream ends.
fn frame_body(response: Response) -> InboundStream {
    let state = BodyState {
        body: response.bytes_stream(),
        framer: LengthDelimitedFramer::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match state.framer.next_frame() {
                Ok(Some(Frame::Record(bytes))) => {
                    return Some((InboundUnit::Record(bytes), state));
                }
                Ok(Some(Frame::KeepAlive)) => return Some((InboundUnit::KeepAlive, state)),
                Err(e) => {
                    state.done = true;
                    return Some((InboundUnit::Signal(e), state));
                }
                Ok(None) => {}
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.framer.push(&chunk),
                Some(Err(e)) => {
                    state.done = true;
                    let signal = InboundUnit::Signal(TransportError::Network(e.to_string()));
                    return Some((signal, state));
                }
                None => {
                    if state.framer.buffered() > 0 {
                        debug!(
                            bytes = state.framer.buffered(),
                            "Dropping partial record at end of stream"
                        );
                    }
                    return None;
                }
            }
        }
    })
    .boxed()
}
