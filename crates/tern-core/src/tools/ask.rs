//! Follow-up question tool

use async_trait::async_trait;

use crate::host::{AskResponse, MessageKind};
use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse};

/// Tool that relays a question to the user and returns the answer
pub struct AskFollowupTool;

#[async_trait]
impl Tool for AskFollowupTool {
    fn name(&self) -> ToolName {
        ToolName::AskFollowupQuestion
    }

    fn description(&self) -> &str {
        "Ask the user a clarifying question. Optionally provide a list of suggested answers in the options parameter."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Question]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let question = block.param(ParamName::Question).unwrap_or_default();
        let options = block.param(ParamName::Options);

        let prompt = match options {
            Some(options) => format!("{}\nOptions: {}", question, options),
            None => question.to_string(),
        };

        let reply = ctx
            .host
            .ask(MessageKind::Followup, Some(&prompt), false)
            .await;

        let answer = match reply.response {
            AskResponse::MessageResponse => reply.text.unwrap_or_default(),
            AskResponse::YesButtonClicked => "yes".to_string(),
            AskResponse::NoButtonClicked => "no".to_string(),
        };

        ToolResponse::text(format!("<answer>\n{}\n</answer>", answer))
    }
}
