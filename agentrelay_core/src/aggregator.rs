//! Folds an agent reply into one displayable string.

use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::{FragmentStream, GatewayError, GatewayResponse};

/// Returned when the agent produced nothing usable. Never empty.
pub const NO_RESPONSE_SENTINEL: &str =
    "I received your message but couldn't generate a proper response. Please try again.";

/// Payload fields that may hold the reply text, highest priority first.
const PAYLOAD_TEXT_FIELDS: [&str; 3] = ["text", "content", "output"];

/// Reduce a gateway response to a single reply.
///
/// Fragments are joined in emission order. A payload yields its first
/// non-empty text field, or its JSON rendering when none is set. Empty
/// results degrade to [`NO_RESPONSE_SENTINEL`]. Only a fragment stream can
/// fail, when the gateway reports an error part way through.
pub async fn aggregate(response: GatewayResponse) -> Result<String, GatewayError> {
    let text = match response {
        GatewayResponse::FragmentSequence(fragments) => collect_fragments(fragments).await?,
        GatewayResponse::StructuredPayload(payload) => reduce_payload(&payload),
        GatewayResponse::Empty => String::new(),
    };

    if text.is_empty() {
        return Ok(NO_RESPONSE_SENTINEL.to_string());
    }
    Ok(text)
}

/// Concatenate fragment bytes left to right and decode once, so a UTF-8
/// sequence split across two fragments still decodes cleanly.
pub async fn collect_fragments(mut fragments: FragmentStream) -> Result<String, GatewayError> {
    let mut buf = Vec::new();
    let mut count = 0_usize;

    while let Some(fragment) = fragments.next().await {
        let bytes = fragment?;
        count += 1;
        debug!("Fragment {count}: {} bytes", bytes.len());
        buf.extend_from_slice(&bytes);
    }

    debug!("Collected {count} fragments, {} bytes total", buf.len());
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Pick the reply text out of a structured payload.
#[must_use]
pub fn reduce_payload(payload: &Value) -> String {
    match payload {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(fields) => PAYLOAD_TEXT_FIELDS
            .iter()
            .find_map(|name| match fields.get(*name) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| payload.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    fn fragments(parts: &[&str]) -> GatewayResponse {
        let items: Vec<Result<Vec<u8>, GatewayError>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        GatewayResponse::FragmentSequence(stream::iter(items).boxed())
    }

    #[tokio::test]
    async fn fragments_join_in_order() {
        let text = aggregate(fragments(&["Hel", "lo, ", "world"])).await;
        assert_eq!(text, Ok("Hello, world".to_string()));
    }

    #[tokio::test]
    async fn fragment_order_matters() {
        let forward = aggregate(fragments(&["Hel", "lo, ", "world"])).await;
        let reversed = aggregate(fragments(&["world", "lo, ", "Hel"])).await;
        assert_ne!(forward, reversed);
    }

    #[tokio::test]
    async fn split_multibyte_character_survives() {
        let bytes = "héllo".as_bytes();
        let items: Vec<Result<Vec<u8>, GatewayError>> =
            vec![Ok(bytes[..2].to_vec()), Ok(bytes[2..].to_vec())];
        let text = aggregate(GatewayResponse::FragmentSequence(stream::iter(items).boxed())).await;
        assert_eq!(text, Ok("héllo".to_string()));
    }

    #[tokio::test]
    async fn fragment_error_aborts() {
        let items: Vec<Result<Vec<u8>, GatewayError>> = vec![
            Ok(b"partial".to_vec()),
            Err(GatewayError::Throttled("mid-stream".into())),
        ];
        let result = aggregate(GatewayResponse::FragmentSequence(stream::iter(items).boxed())).await;
        assert_eq!(result, Err(GatewayError::Throttled("mid-stream".into())));
    }

    #[tokio::test]
    async fn empty_fragment_stream_yields_sentinel() {
        let text = aggregate(fragments(&[])).await;
        assert_eq!(text, Ok(NO_RESPONSE_SENTINEL.to_string()));
    }

    #[tokio::test]
    async fn empty_and_null_yield_sentinel() {
        assert_eq!(
            aggregate(GatewayResponse::Empty).await,
            Ok(NO_RESPONSE_SENTINEL.to_string())
        );
        assert_eq!(
            aggregate(GatewayResponse::StructuredPayload(Value::Null)).await,
            Ok(NO_RESPONSE_SENTINEL.to_string())
        );
    }

    #[test]
    fn text_field_wins() {
        let payload = json!({"output": "c", "content": "b", "text": "a"});
        assert_eq!(reduce_payload(&payload), "a");
    }

    #[test]
    fn content_beats_output() {
        let payload = json!({"content": "from content", "output": "from output"});
        assert_eq!(reduce_payload(&payload), "from content");
    }

    #[test]
    fn empty_text_field_is_skipped() {
        let payload = json!({"text": "", "output": "fallback"});
        assert_eq!(reduce_payload(&payload), "fallback");
    }

    #[test]
    fn unknown_payload_is_rendered_whole() {
        let payload = json!({"answer": 42});
        assert_eq!(reduce_payload(&payload), r#"{"answer":42}"#);
    }
}
