//! Client-side transport to a running engine

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    error::{Result, TomatoError},
    protocol::{Command, CommandResponse, EngineEvent},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Request/response channel from a display to the engine
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn request(&self, command: Command) -> Result<CommandResponse>;
}

/// Talks to the daemon's HTTP API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Follow the engine's broadcast stream, forwarding each event to `tx`.
    /// Returns when the connection drops or the receiver is gone.
    pub async fn stream_events(self, tx: mpsc::UnboundedSender<EngineEvent>) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/events", self.base_url))
            .header("accept", "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        debug!("Subscribed to {}/events", self.base_url);
        parse_sse_stream(response.bytes_stream(), tx).await;
        Ok(())
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn request(&self, command: Command) -> Result<CommandResponse> {
        let response = self
            .client
            .post(format!("{}/command", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(&command)
            .send()
            .await?;

        // 409 still carries a REJECTED body with the current state
        if response.status() != StatusCode::CONFLICT {
            let status = response.status();
            if !status.is_success() {
                return Err(TomatoError::Delivery(format!(
                    "{} answered {}",
                    command.name(),
                    status
                )));
            }
        }

        Ok(response.json::<CommandResponse>().await?)
    }
}

/// Split an SSE byte stream on blank lines and forward decoded events
pub async fn parse_sse_stream<S, B, E>(byte_stream: S, tx: mpsc::UnboundedSender<EngineEvent>)
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut buffer: Vec<u8> = Vec::new();
    tokio::pin!(byte_stream);

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Event stream interrupted: {}", e);
                return;
            }
        };
        for block in drain_blocks(&mut buffer, chunk.as_ref()) {
            if let Some(event) = decode_event_block(&block) {
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
    }
}

/// Append `chunk` and take every complete blank-line-terminated block.
/// Bytes are only decoded once a block is whole.
fn drain_blocks(buffer: &mut Vec<u8>, chunk: &[u8]) -> Vec<String> {
    // Drop CR so CRLF framing splits on the same blank line. A CR byte
    // never occurs inside a multibyte UTF-8 sequence.
    buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

    let mut blocks = Vec::new();
    while let Some(pos) = buffer.windows(2).position(|w| w == b"\n\n") {
        let block: Vec<u8> = buffer.drain(..pos + 2).collect();
        blocks.push(String::from_utf8_lossy(&block).into_owned());
    }
    blocks
}

fn decode_event_block(block: &str) -> Option<EngineEvent> {
    let data: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect();
    if data.is_empty() {
        // keep-alive comment
        return None;
    }

    match serde_json::from_str(&data.join("\n")) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping undecodable event: {}", e);
            None
        }
    }
}
