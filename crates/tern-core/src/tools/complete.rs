//! Task completion tool

use async_trait::async_trait;

use crate::host::MessageKind;
use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse};

/// Tool the model calls to declare the task finished. The orchestrator
/// terminates its loop within the same turn.
pub struct AttemptCompletionTool;

#[async_trait]
impl Tool for AttemptCompletionTool {
    fn name(&self) -> ToolName {
        ToolName::AttemptCompletion
    }

    fn description(&self) -> &str {
        "Present the final result of the task. Optionally include a command that demonstrates the result."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Result]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let result = block.param(ParamName::Result).unwrap_or_default();
        let command = block.param(ParamName::Command);

        {
            let mut state = ctx.state.lock();
            state.completion_result = Some(result.to_string());
            state.completion_command = command.map(|c| c.to_string());
        }

        ctx.host
            .say(MessageKind::CompletionResult, Some(result), false)
            .await;

        ToolResponse::text("")
    }
}
