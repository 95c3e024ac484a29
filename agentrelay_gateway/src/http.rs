use std::time::SystemTime;

use agentrelay_core::{AgentGateway, AgentRequest, GatewayError, GatewayResponse};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::eventstream::{EVENT_STREAM_CONTENT_TYPE, chunk_fragments};
use crate::retry::retry_on_throttle;
use crate::sigv4::SigV4Signer;

/// Header carrying the upstream exception name, e.g. `ThrottlingException:http://...`.
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Upstream exception names and the category each maps to.
const EXCEPTIONS: [(&str, fn(String) -> GatewayError); 4] = [
    ("ValidationException", GatewayError::Validation),
    ("ResourceNotFoundException", GatewayError::NotFound),
    ("AccessDeniedException", GatewayError::AccessDenied),
    ("ThrottlingException", GatewayError::Throttled),
];

/// Agent gateway speaking the agent runtime's REST `InvokeAgent` call.
///
/// Requests are signed with SigV4 when a signer is set, otherwise sent with
/// the optional bearer key. Replies are read according to their content
/// type: an event stream yields its chunk events, JSON becomes a payload and
/// any other body is relayed as raw fragments.
pub struct HttpAgentGateway {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    signer: Option<SigV4Signer>,
    throttle_retry_delays: Vec<u64>,
}

impl HttpAgentGateway {
    pub fn new(endpoint: &str) -> Result<Self, GatewayError> {
        let endpoint = Url::parse(endpoint.trim())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GatewayError::Validation(format!("Invalid agent endpoint: {endpoint}")))?;
        info!("Creating HttpAgentGateway for {endpoint}");
        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: None,
            signer: None,
            throttle_retry_delays: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    #[must_use]
    pub fn with_signer(mut self, signer: SigV4Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    #[must_use]
    pub fn with_throttle_retry_delays(mut self, delays: Vec<u64>) -> Self {
        self.throttle_retry_delays = delays;
        self
    }

    /// Build the `InvokeAgent` URL, one path segment per identifier.
    fn invoke_url(&self, request: &AgentRequest) -> Result<Url, GatewayError> {
        for (field, value) in [
            ("agentId", &request.agent_id),
            ("agentAliasId", &request.agent_alias_id),
            ("sessionId", &request.session_id),
        ] {
            if !is_identifier(value) {
                return Err(GatewayError::Validation(format!(
                    "{field} must consist of [0-9a-zA-Z._:-] and cannot be a dot segment: {value:?}"
                )));
            }
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::Validation(format!("Invalid agent endpoint: {}", self.endpoint))
            })?
            .pop_if_empty()
            .extend([
                "agents",
                request.agent_id.as_str(),
                "agentAliases",
                request.agent_alias_id.as_str(),
                "sessions",
                request.session_id.as_str(),
                "text",
            ]);
        Ok(url)
    }

    /// Send one invocation and classify what comes back.
    async fn try_send(&self, request: &AgentRequest) -> Result<GatewayResponse, GatewayError> {
        let url = self.invoke_url(request)?;
        let body = serde_json::to_vec(&json!({
            "inputText": request.input_text,
            "sessionState": {
                "sessionAttributes": {},
                "promptSessionAttributes": {},
            },
        }))
        .map_err(|e| GatewayError::Unclassified(e.to_string()))?;

        let mut builder = self.client.post(url.clone()).header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if let Some(signer) = &self.signer {
            let signed = signer.sign_post(url.as_str(), JSON_CONTENT_TYPE, &body, SystemTime::now())?;
            for (name, value) in signed {
                builder = builder.header(name, value);
            }
        } else if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::Unclassified(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_type = response
                .headers()
                .get(ERROR_TYPE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, error_type.as_deref(), &detail));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with(EVENT_STREAM_CONTENT_TYPE) {
            return Ok(GatewayResponse::FragmentSequence(chunk_fragments(
                response.bytes_stream(),
            )));
        }

        if content_type.starts_with(JSON_CONTENT_TYPE) {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| GatewayError::Unclassified(e.to_string()))?;
            return parse_payload(&bytes);
        }

        let fragments = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| {
                        debug!("Fragment received: {} bytes", bytes.len());
                        bytes.to_vec()
                    })
                    .map_err(|e| GatewayError::Unclassified(e.to_string()))
            })
            .boxed();

        Ok(GatewayResponse::FragmentSequence(fragments))
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn invoke(&self, request: &AgentRequest) -> Result<GatewayResponse, GatewayError> {
        info!(
            "Sending InvokeAgent request: agent_id={}, alias_id={}, session_id={}",
            request.agent_id, request.agent_alias_id, request.session_id
        );

        let response =
            retry_on_throttle(|| self.try_send(request), &self.throttle_retry_delays).await?;

        info!("Received InvokeAgent response: kind={}", response.kind());
        Ok(response)
    }
}

/// Identifiers the runtime accepts as a single path segment.
fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b':' | b'-'))
}

/// Decode a JSON reply body. An empty body or `null` means no reply.
fn parse_payload(bytes: &[u8]) -> Result<GatewayResponse, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(GatewayResponse::Empty);
    }

    let payload: Value = serde_json::from_slice(bytes)
        .map_err(|e| GatewayError::Unclassified(format!("Invalid response format: {e}")))?;

    Ok(if payload.is_null() {
        GatewayResponse::Empty
    } else {
        GatewayResponse::StructuredPayload(payload)
    })
}

/// Map a failed invocation to an error category.
///
/// The exception name in the error-type header is authoritative; the HTTP
/// status is only consulted when the header is missing or unrecognised.
fn classify_failure(status: StatusCode, error_type: Option<&str>, body: &str) -> GatewayError {
    let detail = error_detail(status, body);

    if let Some(make) = error_type.and_then(exception_category) {
        return make(detail);
    }

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => GatewayError::Validation(detail),
        StatusCode::NOT_FOUND => GatewayError::NotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::AccessDenied(detail),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::Throttled(detail),
        _ => GatewayError::Unclassified(detail),
    }
}

/// Category constructor for an exception name.
///
/// Matching ignores case, since event-stream exceptions arrive as
/// `throttlingException`, and drops any `:namespace` suffix.
pub fn exception_category(name: &str) -> Option<fn(String) -> GatewayError> {
    let name = name.split(':').next().unwrap_or_default().trim();
    EXCEPTIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, make)| *make)
}

/// Prefer the `message` field of a JSON error body, then the raw body.
fn error_detail(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("Message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    }
}
