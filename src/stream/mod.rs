//! Stream consumer: turns the analysis response body into ordered events.
//!
//! The body is read chunk by chunk, decoded into [`StreamMessage`]s and
//! forwarded as they complete. Consumers always see `Opened` first and
//! exactly one `Closed` last.

mod decoder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{VizError, VizResult};
use crate::types::StreamMessage;

pub use decoder::SseDecoder;

/// Reported when the body ends without `complete` or `error`.
pub const TRUNCATED_STREAM_MESSAGE: &str = "Stream ended before analysis completed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum StreamOutcome {
    /// The body ended after a terminal message.
    Finished,
    /// Transport failure or a body cut short.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Opened,
    Message(StreamMessage),
    Closed(StreamOutcome),
}

/// Source of raw body chunks; `None` marks the end of the body.
#[async_trait]
pub trait ChunkSource: Send {
    async fn next_chunk(&mut self) -> VizResult<Option<Vec<u8>>>;
}

#[async_trait]
impl ChunkSource for reqwest::Response {
    async fn next_chunk(&mut self) -> VizResult<Option<Vec<u8>>> {
        // Headers are in; a failure now is the body breaking off.
        let chunk = self
            .chunk()
            .await
            .map_err(|e| VizError::Stream(e.to_string()))?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}

/// In-memory chunks, mostly for tests and replays.
#[async_trait]
impl ChunkSource for std::collections::VecDeque<Vec<u8>> {
    async fn next_chunk(&mut self) -> VizResult<Option<Vec<u8>>> {
        Ok(self.pop_front())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub messages: usize,
    pub malformed: usize,
    pub outcome: StreamOutcome,
}

/// Read `source` to the end, forwarding events on `tx`.
///
/// Stops early if the receiving side is gone, which is how a superseded
/// request winds down.
pub async fn consume<S>(mut source: S, tx: &mpsc::UnboundedSender<StreamEvent>) -> StreamSummary
where
    S: ChunkSource,
{
    let mut decoder = SseDecoder::new();
    let mut messages = 0;
    let mut terminal = false;

    if tx.send(StreamEvent::Opened).is_err() {
        return StreamSummary {
            messages,
            malformed: 0,
            outcome: cancelled(),
        };
    }

    let outcome = loop {
        match source.next_chunk().await {
            Ok(Some(chunk)) => {
                for message in decoder.push(&chunk) {
                    terminal |= message.is_terminal();
                    messages += 1;
                    if tx.send(StreamEvent::Message(message)).is_err() {
                        debug!("Stream receiver dropped, stopping");
                        return StreamSummary {
                            messages,
                            malformed: decoder.malformed(),
                            outcome: cancelled(),
                        };
                    }
                }
            }
            Ok(None) => {
                if let Some(message) = decoder.finish() {
                    terminal |= message.is_terminal();
                    messages += 1;
                    let _ = tx.send(StreamEvent::Message(message));
                }
                break if terminal {
                    StreamOutcome::Finished
                } else {
                    warn!(messages, "Stream ended without a terminal message");
                    StreamOutcome::Failed(TRUNCATED_STREAM_MESSAGE.into())
                };
            }
            Err(e) => {
                warn!(error = %e, "Stream read failed");
                break StreamOutcome::Failed(e.user_message());
            }
        }
    };

    let _ = tx.send(StreamEvent::Closed(outcome.clone()));
    debug!(messages, malformed = decoder.malformed(), ?outcome, "Stream closed");
    StreamSummary {
        messages,
        malformed: decoder.malformed(),
        outcome,
    }
}

fn cancelled() -> StreamOutcome {
    StreamOutcome::Failed(VizError::Cancelled.user_message())
}
