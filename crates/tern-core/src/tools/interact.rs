//! Interaction tools: plan responses, task hand-off, history flags
//!
//! These emit events or set orchestrator flags; none of them touch files.

use async_trait::async_trait;

use crate::host::{AskResponse, MessageKind};
use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse};

/// Tool for replying to the user while in plan mode
pub struct PlanModeRespondTool;

#[async_trait]
impl Tool for PlanModeRespondTool {
    fn name(&self) -> ToolName {
        ToolName::PlanModeRespond
    }

    fn description(&self) -> &str {
        "Respond to the user with a plan before making changes. The user's reply comes back as the tool result."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Response]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let response = block.param(ParamName::Response).unwrap_or_default();
        let reply = ctx
            .host
            .ask(MessageKind::Followup, Some(response), false)
            .await;
        let text = match reply.response {
            AskResponse::MessageResponse => reply.text.unwrap_or_default(),
            AskResponse::YesButtonClicked => "The user approved the plan.".to_string(),
            AskResponse::NoButtonClicked => "The user rejected the plan.".to_string(),
        };
        ToolResponse::text(format!("<user_message>\n{}\n</user_message>", text))
    }
}

/// Tool that prepares a fresh task seeded with carried-over context
pub struct NewTaskTool;

#[async_trait]
impl Tool for NewTaskTool {
    fn name(&self) -> ToolName {
        ToolName::NewTask
    }

    fn description(&self) -> &str {
        "Start a new task with the given context carried over. The current conversation is closed out."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Context]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let context = block.param(ParamName::Context).unwrap_or_default();
        ctx.state.lock().should_clear_history = true;
        ctx.host.say(MessageKind::Text, Some(context), false).await;
        ToolResponse::text("A new task will be started with the provided context.")
    }
}

/// Tool that schedules history compression before the next model call
pub struct CompressConversationTool;

#[async_trait]
impl Tool for CompressConversationTool {
    fn name(&self) -> ToolName {
        ToolName::CompressConversation
    }

    fn description(&self) -> &str {
        "Compress older conversation history to free up context window space."
    }

    fn required_params(&self) -> &[ParamName] {
        &[]
    }

    async fn execute(&self, _block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        ctx.state.lock().should_compress_history = true;
        ToolResponse::text("Conversation compression is scheduled for the next request.")
    }
}

/// Tool that records a task summary while trimming history
pub struct SummarizeTaskTool;

#[async_trait]
impl Tool for SummarizeTaskTool {
    fn name(&self) -> ToolName {
        ToolName::SummarizeTask
    }

    fn description(&self) -> &str {
        "Record a summary of progress so far; used when the conversation is being trimmed."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Context]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let context = block.param(ParamName::Context).unwrap_or_default();
        ctx.state.lock().currently_summarizing = true;
        ctx.host.say(MessageKind::Text, Some(context), false).await;
        ToolResponse::text("Summary recorded.")
    }
}

/// Tool that updates the running task checklist
pub struct FocusChainTool;

#[async_trait]
impl Tool for FocusChainTool {
    fn name(&self) -> ToolName {
        ToolName::FocusChain
    }

    fn description(&self) -> &str {
        "Update the task checklist that tracks remaining steps."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Checklist]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let checklist = block.param(ParamName::Checklist).unwrap_or_default();
        ctx.state.lock().focus_chain_checklist = Some(checklist.to_string());
        ToolResponse::text("Checklist updated.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::AskReply;
    use crate::testutil::{ScriptedHost, make_context_with, make_tool_block};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_plan_mode_returns_user_reply() {
        let host = Arc::new(ScriptedHost::with_replies(vec![AskReply::message(
            "looks good, go ahead",
        )]));
        let ctx = make_context_with(std::env::temp_dir(), host);

        let block = make_tool_block(
            ToolName::PlanModeRespond,
            &[(ParamName::Response, "1. refactor 2. test")],
        );
        let resp = PlanModeRespondTool.execute(&block, &ctx).await;
        assert!(resp.text_content().contains("looks good, go ahead"));
    }

    #[tokio::test]
    async fn test_new_task_sets_clear_flag() {
        let ctx = make_context_with(std::env::temp_dir(), Arc::new(ScriptedHost::approving()));
        let block = make_tool_block(ToolName::NewTask, &[(ParamName::Context, "carry this")]);
        NewTaskTool.execute(&block, &ctx).await;
        assert!(ctx.state.lock().should_clear_history);
    }

    #[tokio::test]
    async fn test_compress_sets_flag() {
        let ctx = make_context_with(std::env::temp_dir(), Arc::new(ScriptedHost::approving()));
        let block = make_tool_block(ToolName::CompressConversation, &[]);
        CompressConversationTool.execute(&block, &ctx).await;
        assert!(ctx.state.lock().should_compress_history);
    }

    #[tokio::test]
    async fn test_summarize_sets_flag() {
        let ctx = make_context_with(std::env::temp_dir(), Arc::new(ScriptedHost::approving()));
        let block = make_tool_block(ToolName::SummarizeTask, &[(ParamName::Context, "so far")]);
        SummarizeTaskTool.execute(&block, &ctx).await;
        assert!(ctx.state.lock().currently_summarizing);
    }

    #[tokio::test]
    async fn test_focus_chain_stores_checklist() {
        let ctx = make_context_with(std::env::temp_dir(), Arc::new(ScriptedHost::approving()));
        let block = make_tool_block(
            ToolName::FocusChain,
            &[(ParamName::Checklist, "- [x] read\n- [ ] write")],
        );
        FocusChainTool.execute(&block, &ctx).await;
        assert_eq!(
            ctx.state.lock().focus_chain_checklist.as_deref(),
            Some("- [x] read\n- [ ] write")
        );
    }
}
