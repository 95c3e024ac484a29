#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Session and turn management for relaying chat messages to a remote agent.
//!
//! A [`TurnCoordinator`] takes one user message, records it in the
//! [`SessionStore`], calls the [`AgentGateway`], folds whatever comes back
//! into a single reply with [`aggregate`], and records that reply as the
//! agent turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod aggregator;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod store;

pub use aggregator::{NO_RESPONSE_SENTINEL, aggregate};
pub use coordinator::{ChatReply, TurnConfig, TurnCoordinator};
pub use error::{GatewayError, RelayError, Result};
pub use gateway::{AgentGateway, AgentRequest, FragmentStream, GatewayResponse};
pub use store::{InMemorySessionStore, SessionStore};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A conversation and its full turn log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Turn>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            message_count: self.message_count(),
        }
    }
}

/// Diagnostic view of a session, as returned by [`SessionStore::list_sessions`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let turn = Turn::new(Role::Agent, "hello!");
        let json = serde_json::to_value(&turn).unwrap_or_default();
        assert_eq!(json["role"], "agent");
        assert_eq!(json["content"], "hello!");
    }

    #[test]
    fn session_uses_camel_case_fields() {
        let mut session = Session::new("abc");
        session.messages.push(Turn::new(Role::User, "hi"));

        let json = serde_json::to_value(&session).unwrap_or_default();
        assert_eq!(json["id"], "abc");
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["messages"].as_array().map(Vec::len), Some(1));

        let summary = serde_json::to_value(session.summary()).unwrap_or_default();
        assert_eq!(summary["messageCount"], 1);
    }
}
