//! Decoding of `application/vnd.amazon.eventstream` reply bodies.
//!
//! The runtime answers `InvokeAgent` with binary event-stream messages. Only
//! `chunk` events carry reply text, base64 encoded in the `bytes` field of
//! their JSON payload. Trace and other events are skipped; exception
//! messages end the sequence with a classified error.

use std::fmt::Display;

use agentrelay_core::{FragmentStream, GatewayError};
use aws_smithy_eventstream::frame::{DecodedFrame, MessageFrameDecoder};
use aws_smithy_types::event_stream::Message;
use aws_smithy_types::str_bytes::StrBytes;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use tracing::debug;

use crate::http::exception_category;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

#[derive(Deserialize)]
struct ChunkPayload {
    bytes: Option<String>,
}

#[derive(Deserialize)]
struct ExceptionPayload {
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Splits raw body bytes into messages and keeps the text of each chunk.
pub struct ChunkDecoder {
    frames: MessageFrameDecoder,
    pending: Vec<u8>,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            frames: MessageFrameDecoder::new(),
            pending: Vec::new(),
        }
    }

    /// Feed the next piece of the body.
    ///
    /// Returns the decoded bytes of every chunk event completed by `data`, in
    /// order. A message split across reads is held back until it is whole.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Vec<u8>>, GatewayError> {
        self.pending.extend_from_slice(data);
        let mut fragments = Vec::new();

        loop {
            let mut unread = self.pending.as_slice();
            let frame = self
                .frames
                .decode_frame(&mut unread)
                .map_err(|e| GatewayError::Unclassified(format!("Malformed event stream: {e}")))?;
            let consumed = self.pending.len() - unread.len();
            self.pending.drain(..consumed);

            match frame {
                DecodedFrame::Complete(message) => {
                    if let Some(fragment) = chunk_fragment(&message)? {
                        fragments.push(fragment);
                    }
                }
                DecodedFrame::Incomplete => return Ok(fragments),
            }
        }
    }
}

/// Turn an event-stream body into the fragment sequence of its chunk events.
pub fn chunk_fragments<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut decoder = ChunkDecoder::new();
    body.map(move |read| {
        let decoded = read
            .map_err(|e| GatewayError::Unclassified(e.to_string()))
            .and_then(|data| decoder.push(data.as_ref()));
        match decoded {
            Ok(fragments) => fragments.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(err) => vec![Err(err)],
        }
    })
    .flat_map(stream::iter)
    .boxed()
}

fn chunk_fragment(message: &Message) -> Result<Option<Vec<u8>>, GatewayError> {
    if matches!(header(message, ":message-type"), Some("exception" | "error")) {
        return Err(stream_exception(message));
    }

    match header(message, ":event-type") {
        Some("chunk") => decode_chunk(message.payload()).map(Some),
        other => {
            debug!("Skipping event-stream message: {}", other.unwrap_or("untyped"));
            Ok(None)
        }
    }
}

fn decode_chunk(payload: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let chunk: ChunkPayload = serde_json::from_slice(payload)
        .map_err(|e| GatewayError::Unclassified(format!("Invalid chunk event: {e}")))?;

    let Some(encoded) = chunk.bytes else {
        return Ok(Vec::new());
    };
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| GatewayError::Unclassified(format!("Invalid chunk bytes: {e}")))?;
    debug!("Chunk event: {} bytes", bytes.len());
    Ok(bytes)
}

fn stream_exception(message: &Message) -> GatewayError {
    let name = header(message, ":exception-type")
        .or_else(|| header(message, ":error-code"))
        .unwrap_or("UnknownException");
    let text = serde_json::from_slice::<ExceptionPayload>(message.payload())
        .ok()
        .and_then(|p| p.message)
        .or_else(|| header(message, ":error-message").map(str::to_string))
        .unwrap_or_default();

    let detail = if text.is_empty() {
        format!("{name} in event stream")
    } else {
        format!("{name} in event stream: {text}")
    };
    match exception_category(name) {
        Some(make) => make(detail),
        None => GatewayError::Unclassified(detail),
    }
}

fn header<'a>(message: &'a Message, name: &str) -> Option<&'a str> {
    message
        .headers()
        .iter()
        .find(|h| h.name().as_str() == name)
        .and_then(|h| h.value().as_string().ok())
        .map(StrBytes::as_str)
}
