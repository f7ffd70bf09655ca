//! Task executor
//!
//! The top-level loop: build the system prompt, stream the model, parse the
//! assistant text, dispatch at most one tool, fold its result into the next
//! user message, and repeat until `attempt_completion` or a plain text reply.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tern_model::{ContentBlock, Message, ModelClient, StreamChunk};
use tokio_util::sync::CancellationToken;

use crate::context::{ContextManager, DeletionRange};
use crate::error::{CoreError, Result};
use crate::file_tracker::FileTracker;
use crate::host::{AskResponse, HostBridge, MessageKind};
use crate::names::{ParamName, ToolName};
use crate::parser::{AssistantContent, ToolUseBlock, parse_assistant_message};
use crate::registry::ToolRegistry;
use crate::retry::{RetryHook, RetryPolicy};
use crate::tool::ToolContext;

/// In-memory status for one run of the orchestrator
#[derive(Debug, Default)]
pub struct TaskState {
    pub is_streaming: bool,
    pub current_stream_index: usize,
    pub pending_user_content: Vec<ContentBlock>,
    pub did_reject_tool: bool,
    pub did_already_use_tool: bool,
    pub did_edit_file: bool,
    pub consecutive_mistake_count: u32,
    pub consecutive_auto_approved_count: u32,
    pub api_request_count: u32,
    pub abort: bool,
    pub focus_chain_checklist: Option<String>,
    pub deleted_range: Option<DeletionRange>,
    pub should_compress_history: bool,
    pub should_clear_history: bool,
    pub currently_summarizing: bool,
    pub completion_result: Option<String>,
    pub completion_command: Option<String>,
}

/// Inputs the host's prompt builder receives each turn
#[derive(Debug, Clone)]
pub struct PromptEnv {
    pub cwd: PathBuf,
    pub tool_docs: String,
    pub read_files: Vec<String>,
    pub recently_modified: Vec<String>,
    pub focus_checklist: Option<String>,
}

/// Builds the system prompt from the per-turn environment
pub trait PromptBuilder: Send + Sync {
    fn build(&self, env: &PromptEnv) -> String;
}

/// How a task run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The model called attempt_completion
    Completed {
        result: String,
        command: Option<String>,
    },
    /// The model replied without tools; the caller should collect the next
    /// user message
    AwaitingUser,
    /// The run was cancelled
    Aborted,
}

/// Task configuration
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Task working directory
    pub cwd: PathBuf,
    /// Retry policy for model calls
    pub retry: RetryPolicy,
    /// Mistake backstop threshold
    pub max_consecutive_mistakes: u32,
    /// Self-recovery attempts on stream failures
    pub max_recovery_attempts: u32,
    /// Override for the external search binary
    pub search_binary: Option<PathBuf>,
    /// Extra environment for spawned commands
    pub env_overrides: Vec<(String, String)>,
}

impl TaskConfig {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            retry: RetryPolicy::default(),
            max_consecutive_mistakes: 3,
            max_recovery_attempts: 3,
            search_binary: None,
            env_overrides: vec![],
        }
    }
}

/// The orchestrator for one conversation
pub struct Task {
    client: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    host: Arc<dyn HostBridge>,
    prompt_builder: Arc<dyn PromptBuilder>,
    config: TaskConfig,
    state: Arc<Mutex<TaskState>>,
    tracker: Arc<Mutex<FileTracker>>,
    context: ContextManager,
    history: Vec<Message>,
    total_tokens: u32,
    cancel: CancellationToken,
    retry_hook: Option<Box<RetryHook>>,
}

impl Task {
    pub fn new(
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        host: Arc<dyn HostBridge>,
        prompt_builder: Arc<dyn PromptBuilder>,
        config: TaskConfig,
    ) -> Self {
        Self {
            client,
            registry,
            host,
            prompt_builder,
            config,
            state: Arc::new(Mutex::new(TaskState::default())),
            tracker: Arc::new(Mutex::new(FileTracker::new())),
            context: ContextManager::new(),
            history: Vec::new(),
            total_tokens: 0,
            cancel: CancellationToken::new(),
            retry_hook: None,
        }
    }

    /// The conversation history
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Load history from a resumed session
    pub fn set_history(&mut self, history: Vec<Message>) {
        self.history = history;
    }

    /// Restore the last observed token usage (from session metadata)
    pub fn set_total_tokens(&mut self, total: u32) {
        self.total_tokens = total;
    }

    /// Last observed token usage
    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    /// Shared state handle
    pub fn state(&self) -> Arc<Mutex<TaskState>> {
        self.state.clone()
    }

    /// Shared tracker handle
    pub fn tracker(&self) -> Arc<Mutex<FileTracker>> {
        self.tracker.clone()
    }

    /// The overlay map, for persistence
    pub fn context_manager(&self) -> &ContextManager {
        &self.context
    }

    /// Restore overlays from a resumed session
    pub fn set_context_manager(&mut self, context: ContextManager) {
        self.context = context;
    }

    /// Restore the deletion range from a resumed session
    pub fn set_deleted_range(&mut self, range: Option<DeletionRange>) {
        self.state.lock().deleted_range = range;
    }

    /// Observe retry attempts (attempt, max, delay_ms, error)
    pub fn set_retry_hook(&mut self, hook: Box<RetryHook>) {
        self.retry_hook = Some(hook);
    }

    /// Token for cancelling the run from another task
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation
    pub fn abort(&self) {
        self.state.lock().abort = true;
        self.cancel.cancel();
    }

    fn tool_context(&self) -> ToolContext {
        ToolContext {
            cwd: self.config.cwd.clone(),
            state: self.state.clone(),
            tracker: self.tracker.clone(),
            host: self.host.clone(),
            cancel: self.cancel.clone(),
            search_binary: self.config.search_binary.clone(),
            env_overrides: self.config.env_overrides.clone(),
        }
    }

    fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled() || self.state.lock().abort
    }

    /// Run the loop for one user message
    pub async fn run(&mut self, user_input: &str) -> Result<TaskOutcome> {
        self.history.push(Message::user(user_input));

        loop {
            if self.is_aborted() {
                return self.finish_aborted().await;
            }

            self.state.lock().api_request_count += 1;
            self.maybe_shrink_context();

            self.host
                .say(MessageKind::ApiReqStarted, None, false)
                .await;

            let env = self.prompt_env();
            let system_prompt = self.prompt_builder.build(&env);
            let range = self.state.lock().deleted_range;
            let messages = self.context.truncated_messages(&self.history, range);

            let assistant_text = match self.stream_turn(&system_prompt, &messages).await {
                Ok(text) => text,
                Err(e) => {
                    self.host
                        .say(
                            MessageKind::Error,
                            Some(&format!("{} ({})", e, e.hint())),
                            false,
                        )
                        .await;
                    return Err(e);
                }
            };

            if self.is_aborted() {
                if !assistant_text.trim().is_empty() {
                    self.history.push(Message::assistant(assistant_text));
                }
                return self.finish_aborted().await;
            }

            self.history.push(Message::assistant(assistant_text.clone()));
            let blocks = parse_assistant_message(&assistant_text);

            {
                let mut state = self.state.lock();
                state.did_already_use_tool = false;
                state.did_reject_tool = false;
            }

            let mut used_tool = false;
            for block in &blocks {
                let AssistantContent::ToolUse(tool_use) = block else {
                    continue;
                };
                if tool_use.partial {
                    continue;
                }
                if self.is_aborted() {
                    break;
                }

                if self.state.lock().did_reject_tool {
                    self.push_pending_text(format!(
                        "Skipping tool [{}] due to the previous rejection.",
                        tool_use.name
                    ));
                    continue;
                }
                if self.state.lock().did_already_use_tool {
                    self.push_pending_text(format!(
                        "Tool [{}] was not executed: only one tool may be used per message. Use it in the next message if it is still needed.",
                        tool_use.name
                    ));
                    continue;
                }

                self.host
                    .say(MessageKind::Tool, Some(tool_use.name.as_str()), false)
                    .await;

                let ctx = self.tool_context();
                let response = self.registry.dispatch(tool_use, &ctx).await;
                self.state.lock().did_already_use_tool = true;
                used_tool = true;

                if tool_use.name == ToolName::AttemptCompletion && !response.is_error {
                    let (result, command) = {
                        let state = self.state.lock();
                        (
                            state.completion_result.clone().unwrap_or_default(),
                            state.completion_command.clone(),
                        )
                    };
                    return Ok(TaskOutcome::Completed { result, command });
                }

                self.fold_tool_result(tool_use, response);
            }

            if self.state.lock().should_clear_history {
                self.history.clear();
                self.context = ContextManager::new();
                let mut state = self.state.lock();
                state.deleted_range = None;
                state.should_clear_history = false;
                state.pending_user_content.clear();
                return Ok(TaskOutcome::AwaitingUser);
            }

            if !used_tool {
                return Ok(TaskOutcome::AwaitingUser);
            }

            self.check_mistake_backstop().await;

            let pending = std::mem::take(&mut self.state.lock().pending_user_content);
            self.history.push(Message::user_with_content(pending));
        }
    }

    async fn finish_aborted(&self) -> Result<TaskOutcome> {
        self.host
            .say(MessageKind::Error, Some("Task aborted"), false)
            .await;
        Ok(TaskOutcome::Aborted)
    }

    /// Shrink the history view before the call when usage is near the window
    fn maybe_shrink_context(&mut self) {
        let window = self.client.info().context_window;
        let force = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.should_compress_history)
        };
        if !force && !ContextManager::should_shrink(self.total_tokens, window) {
            return;
        }
        let effective_tokens = if force {
            self.total_tokens.max(ContextManager::max_allowed(window))
        } else {
            self.total_tokens
        };
        let range = self.state.lock().deleted_range;
        let ts = chrono::Utc::now().timestamp_millis();
        let new_range = self
            .context
            .shrink(&self.history, range, effective_tokens, window, ts);
        self.state.lock().deleted_range = new_range;
    }

    fn prompt_env(&self) -> PromptEnv {
        let mut tracker = self.tracker.lock();
        PromptEnv {
            cwd: self.config.cwd.clone(),
            tool_docs: self.registry.tool_docs(),
            read_files: tracker.read_files(),
            recently_modified: tracker.take_recently_modified(),
            focus_checklist: self.state.lock().focus_chain_checklist.clone(),
        }
    }

    /// One model call with rate-limit retry, then up to
    /// `max_recovery_attempts` full re-tries on stream failures.
    async fn stream_turn(&mut self, system_prompt: &str, messages: &[Message]) -> Result<String> {
        let mut recovery = 0u32;
        loop {
            match self.try_stream_once(system_prompt, messages).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    if self.is_aborted() || recovery >= self.config.max_recovery_attempts {
                        return Err(e);
                    }
                    recovery += 1;
                    tracing::warn!(recovery, "stream failed, recovering: {}", e);
                    self.host
                        .say(
                            MessageKind::Error,
                            Some(&format!("Request failed, retrying: {}", e)),
                            false,
                        )
                        .await;
                    tokio::time::sleep(std::time::Duration::from_secs(recovery as u64)).await;
                }
            }
        }
    }

    async fn try_stream_once(&mut self, system_prompt: &str, messages: &[Message]) -> Result<String> {
        let client = self.client.clone();
        let system_owned = system_prompt.to_string();
        let messages_owned = messages.to_vec();

        let mut stream = self
            .config
            .retry
            .run(
                move || {
                    let client = client.clone();
                    let system = system_owned.clone();
                    let messages = messages_owned.clone();
                    async move { client.stream(&system, &messages).await }
                },
                self.retry_hook.as_deref(),
            )
            .await
            .map_err(CoreError::Api)?;

        {
            let mut state = self.state.lock();
            state.is_streaming = true;
            state.current_stream_index = 0;
        }

        let mut text = String::new();
        let mut failure: Option<CoreError> = None;

        while let Some(chunk) = stream.next().await {
            if self.cancel.is_cancelled() {
                break;
            }
            match chunk {
                Ok(StreamChunk::Text { text: delta }) => {
                    text.push_str(&delta);
                    self.state.lock().current_stream_index = text.len();
                    self.host.say(MessageKind::Text, Some(&delta), true).await;
                }
                Ok(StreamChunk::Reasoning { reasoning }) => {
                    self.host
                        .say(MessageKind::Text, Some(&reasoning), true)
                        .await;
                }
                Ok(StreamChunk::Usage {
                    input_tokens,
                    output_tokens,
                    cache_read_tokens,
                }) => {
                    self.total_tokens = input_tokens + output_tokens + cache_read_tokens;
                }
                Err(e) => {
                    failure = Some(CoreError::Api(e));
                    break;
                }
            }
        }

        self.state.lock().is_streaming = false;
        match failure {
            Some(e) => Err(e),
            None => Ok(text),
        }
    }

    fn push_pending_text(&self, text: String) {
        self.state
            .lock()
            .pending_user_content
            .push(ContentBlock::text(text));
    }

    /// Append a tool's result to the pending user buffer as a header block
    /// plus the handler's content blocks.
    fn fold_tool_result(&self, tool_use: &ToolUseBlock, response: crate::tool::ToolResponse) {
        let header = match tool_use.param(ParamName::Path) {
            Some(path) => format!("[{} for '{}'] Result:", tool_use.name, path),
            None => format!("[{}] Result:", tool_use.name),
        };

        let mut state = self.state.lock();
        state.pending_user_content.push(ContentBlock::text(header));

        let mut pushed_any = false;
        for block in response.content {
            match block {
                ContentBlock::Text { text } if text.trim().is_empty() => {}
                other => {
                    state.pending_user_content.push(other);
                    pushed_any = true;
                }
            }
        }
        if !pushed_any {
            state
                .pending_user_content
                .push(ContentBlock::text("(tool returned no output)"));
        }
    }

    /// After the threshold, pull the user in before continuing
    async fn check_mistake_backstop(&mut self) {
        let count = self.state.lock().consecutive_mistake_count;
        if count < self.config.max_consecutive_mistakes {
            return;
        }

        let reply = self
            .host
            .ask(
                MessageKind::Error,
                Some("The model is making repeated mistakes. Provide guidance, or continue as is."),
                false,
            )
            .await;

        let feedback = match reply.response {
            AskResponse::MessageResponse => format!(
                "You have made too many consecutive mistakes. The user has provided feedback:\n<feedback>\n{}\n</feedback>",
                reply.text.unwrap_or_default()
            ),
            _ => "You have made too many consecutive mistakes. Slow down: re-read the tool documentation and provide every required parameter.".to_string(),
        };
        self.push_pending_text(feedback);
        self.state.lock().consecutive_mistake_count = 0;
    }
}
