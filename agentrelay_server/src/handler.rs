use agentrelay_core::{ChatReply, RelayError, Session, SessionStore, SessionSummary, Turn};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{ApiError, AppState};

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub session_id: String,
    pub messages: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let config = state.relay.config();
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "agentId": config.agent_id,
        "aliasId": config.agent_alias_id,
    }))
}

pub async fn create_session(State(state): State<AppState>) -> Json<CreatedSession> {
    let session_id = state.relay.store().create_session().await;
    Json(CreatedSession { session_id })
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Session> {
    state
        .relay
        .store()
        .get_session(&session_id)
        .await
        .map(Json)
        .map_err(|e| state.reject(e))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatReply> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected chat body: {rejection}");
            return Err(state.reject(RelayError::InvalidInput));
        }
    };

    let (Some(message), Some(session_id)) = (request.message, request.session_id) else {
        return Err(state.reject(RelayError::InvalidInput));
    };

    state
        .relay
        .handle_chat_turn(&session_id, &message)
        .await
        .map(Json)
        .map_err(|e| state.reject(e))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Conversation> {
    let session = state
        .relay
        .store()
        .get_session(&session_id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(Conversation {
        session_id: session.id,
        messages: session.messages,
        created_at: session.created_at,
    }))
}

pub async fn clear_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state
        .relay
        .store()
        .clear_messages(&session_id)
        .await
        .map_err(|e| state.reject(e))?;

    info!("Conversation cleared: {session_id}");
    Ok(Json(json!({ "message": "Conversation cleared" })))
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.relay.store().list_sessions().await)
}

pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrelay_core::{
        AgentGateway, AgentRequest, GatewayError, GatewayResponse, InMemorySessionStore, Role,
        TurnConfig, TurnCoordinator,
    };
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::response::IntoResponse;
    use std::sync::Arc;

    /// Replies with `{text}` unless the input asks to be throttled.
    struct FakeGateway;

    #[async_trait]
    impl AgentGateway for FakeGateway {
        async fn invoke(
            &self,
            request: &AgentRequest,
        ) -> std::result::Result<GatewayResponse, GatewayError> {
            if request.input_text == "throttle me" {
                return Err(GatewayError::Throttled("Rate exceeded for account".into()));
            }
            Ok(GatewayResponse::StructuredPayload(
                json!({ "text": "hello!" }),
            ))
        }
    }

    fn state(expose_error_details: bool) -> AppState {
        let relay = TurnCoordinator::new(
            Arc::new(FakeGateway) as Arc<dyn AgentGateway>,
            Arc::new(InMemorySessionStore::new()) as Arc<dyn SessionStore>,
            TurnConfig {
                agent_id: "AGENT".into(),
                agent_alias_id: "ALIAS".into(),
                ..TurnConfig::default()
            },
        );
        AppState::new(relay, expose_error_details)
    }

    fn chat_body(message: Option<&str>, session_id: Option<&str>) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.map(str::to_string),
            session_id: session_id.map(str::to_string),
        })
    }

    async fn error_body(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_chat_round_trip_records_conversation() {
        let state = state(false);
        let Json(created) = create_session(State(state.clone())).await;

        let Json(reply) = chat(
            State(state.clone()),
            Ok(chat_body(Some("hi"), Some(&created.session_id))),
        )
        .await
        .expect("chat succeeds");
        assert_eq!(reply.response, "hello!");
        assert_eq!(reply.session_id, created.session_id);

        let Json(conversation) =
            get_conversation(State(state.clone()), Path(created.session_id.clone()))
                .await
                .expect("conversation exists");
        let roles: Vec<_> = conversation.messages.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Agent]);

        let Json(listed) = list_sessions(State(state)).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].message_count, 2);
    }

    #[tokio::test]
    async fn test_chat_without_session_id_is_bad_request() {
        let state = state(false);
        let Err(err) = chat(State(state.clone()), Ok(chat_body(Some("hi"), None))).await else {
            panic!("missing sessionId must be rejected");
        };

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message and sessionId are required");
        assert!(state.relay.store().list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_chat_with_blank_message_is_bad_request() {
        let state = state(false);
        let Err(err) = chat(State(state), Ok(chat_body(Some("   "), Some("s")))).await else {
            panic!("blank message must be rejected");
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_throttled_chat_hides_details_by_default() {
        let state = state(false);
        let Err(err) = chat(
            State(state.clone()),
            Ok(chat_body(Some("throttle me"), Some("s-1"))),
        )
        .await
        else {
            panic!("throttled call must fail");
        };

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "Request throttled. Please try again in a moment."
        );
        assert!(body.get("details").is_none());

        let session = state.relay.store().get_session("s-1").await;
        assert!(matches!(session, Ok(ref s) if s.messages.len() == 1));
    }

    #[tokio::test]
    async fn test_development_mode_exposes_details() {
        let state = state(true);
        let Err(err) = chat(State(state), Ok(chat_body(Some("throttle me"), Some("s-1")))).await
        else {
            panic!("throttled call must fail");
        };

        let (_, body) = error_body(err).await;
        assert_eq!(body["details"], "Rate exceeded for account");
    }

    #[tokio::test]
    async fn test_unknown_session_reads_are_not_found() {
        let state = state(false);

        let Err(err) = get_session(State(state.clone()), Path("ghost".into())).await else {
            panic!("unknown session must be 404");
        };
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Session not found");

        let Err(err) = clear_conversation(State(state.clone()), Path("ghost".into())).await else {
            panic!("unknown session must be 404");
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        assert!(state.relay.store().list_sessions().await.is_empty());
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_clear_conversation_empties_log() {
        let state = state(false);
        chat(State(state.clone()), Ok(chat_body(Some("hi"), Some("s-2"))))
            .await
            .expect("chat succeeds");

        let Json(confirmation) = clear_conversation(State(state.clone()), Path("s-2".into()))
            .await
            .expect("clear succeeds");
        assert_eq!(confirmation["message"], "Conversation cleared");

        let Json(session) = get_session(State(state), Path("s-2".into()))
            .await
            .expect("session survives clear");
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn test_health_reports_agent_identity() {
        let Json(body) = health(State(state(false))).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["agentId"], "AGENT");
        assert_eq!(body["aliasId"], "ALIAS");
    }

    #[tokio::test]
    async fn test_unknown_route_fallback_is_json_404() {
        let (status, Json(body)) = not_found().await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Endpoint not found" }));
    }
}
