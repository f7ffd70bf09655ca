//! Tool trait and execution support

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tern_model::ContentBlock;
use tokio_util::sync::CancellationToken;

use crate::file_tracker::FileTracker;
use crate::host::{AskResponse, HostBridge, MessageKind};
use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::task::TaskState;

/// Result of a tool execution, fed back to the model
#[derive(Debug, Clone)]
pub struct ToolResponse {
    /// Content blocks to return to the model
    pub content: Vec<ContentBlock>,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResponse {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }

    /// Create a result with multiple content blocks
    pub fn with_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Get the text content as a single string
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Per-task context handed to every tool invocation.
///
/// Handlers are stateless; everything task-scoped arrives here. The tracker
/// and state are owned by the orchestrator and outlive any invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// Task working directory
    pub cwd: PathBuf,
    /// Orchestrator state (mistake counters, edit flags)
    pub state: Arc<Mutex<TaskState>>,
    /// File-context tracker
    pub tracker: Arc<Mutex<FileTracker>>,
    /// Host callbacks
    pub host: Arc<dyn HostBridge>,
    /// Cancellation flag shared with the orchestrator
    pub cancel: CancellationToken,
    /// Override for the external search binary (defaults to `rg` on PATH)
    pub search_binary: Option<PathBuf>,
    /// Extra environment variables for spawned commands
    pub env_overrides: Vec<(String, String)>,
}

impl ToolContext {
    /// Resolve a tool-supplied relative path against the task directory
    pub fn resolve(&self, rel_path: &str) -> PathBuf {
        let p = PathBuf::from(rel_path);
        if p.is_absolute() { p } else { self.cwd.join(p) }
    }
}

/// Trait for executable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (the wire tag)
    fn name(&self) -> ToolName;

    /// Tool description for the system prompt
    fn description(&self) -> &str;

    /// Parameters that must be present before execution
    fn required_params(&self) -> &[ParamName];

    /// Example usage rendered into the system prompt
    fn usage(&self) -> String {
        let name = self.name().as_str();
        let params = self
            .required_params()
            .iter()
            .map(|p| format!("<{p}>...</{p}>", p = p.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        if params.is_empty() {
            format!("<{name}>\n</{name}>")
        } else {
            format!("<{name}>\n{params}\n</{name}>")
        }
    }

    /// Execute the tool. Errors are folded into the response; this never
    /// fails at the Rust level.
    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse;
}

/// Type alias for a boxed tool
pub type BoxedTool = Arc<dyn Tool>;

/// Ask the host for approval unless the tool is auto-approved.
///
/// `force_ask` overrides the auto-approval shortcut, for calls the model
/// itself flagged as needing consent. Returns `Some(denial)` when the user
/// rejected; the caller must return it without performing the side effect.
pub async fn request_approval(
    ctx: &ToolContext,
    tool: ToolName,
    preview: &str,
    force_ask: bool,
) -> Option<ToolResponse> {
    if !force_ask && ctx.host.should_auto_approve(tool) {
        ctx.state.lock().consecutive_auto_approved_count += 1;
        return None;
    }
    ctx.state.lock().consecutive_auto_approved_count = 0;

    let kind = match tool {
        ToolName::ExecuteCommand => MessageKind::Command,
        _ => MessageKind::Tool,
    };
    let reply = ctx.host.ask(kind, Some(preview), false).await;
    match reply.response {
        AskResponse::YesButtonClicked => None,
        AskResponse::NoButtonClicked => {
            ctx.state.lock().did_reject_tool = true;
            Some(ToolResponse::error("The user denied this operation."))
        }
        AskResponse::MessageResponse => {
            ctx.state.lock().did_reject_tool = true;
            let feedback = reply.text.unwrap_or_default();
            ctx.host
                .say(MessageKind::UserFeedback, Some(&feedback), false)
                .await;
            Some(ToolResponse::error(format!(
                "The user denied this operation and provided the following feedback:\n<feedback>\n{}\n</feedback>",
                feedback
            )))
        }
    }
}
