//! Host callback seam
//!
//! The orchestrator never talks to a terminal or UI directly; it emits `say`
//! events and suspends on `ask` events through this trait. Hosts decide how
//! to render them and whether tools are auto-approved.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::names::ToolName;

/// Closed set of message kinds for say/ask events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Tool,
    Command,
    CommandOutput,
    CompletionResult,
    Error,
    UserFeedback,
    Followup,
    ApiReqStarted,
}

/// How the user answered an ask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AskResponse {
    YesButtonClicked,
    NoButtonClicked,
    MessageResponse,
}

/// The host's answer to an ask event
#[derive(Debug, Clone)]
pub struct AskReply {
    pub response: AskResponse,
    pub text: Option<String>,
    pub images: Option<Vec<String>>,
}

impl AskReply {
    pub fn yes() -> Self {
        Self {
            response: AskResponse::YesButtonClicked,
            text: None,
            images: None,
        }
    }

    pub fn no() -> Self {
        Self {
            response: AskResponse::NoButtonClicked,
            text: None,
            images: None,
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self {
            response: AskResponse::MessageResponse,
            text: Some(text.into()),
            images: None,
        }
    }
}

/// Callbacks injected into the orchestrator by the host
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Emit a message event to the user. Returns an event timestamp when the
    /// host records one.
    async fn say(&self, kind: MessageKind, text: Option<&str>, partial: bool) -> Option<i64>;

    /// Solicit user input; suspends until the host responds.
    async fn ask(&self, kind: MessageKind, text: Option<&str>, partial: bool) -> AskReply;

    /// Whether the named tool runs without an approval prompt
    fn should_auto_approve(&self, tool: ToolName) -> bool;
}
