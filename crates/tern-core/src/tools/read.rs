//! File reading tool

use async_trait::async_trait;
use tokio::fs;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};

/// Tool for reading file contents
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> ToolName {
        ToolName::ReadFile
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path, relative to the working directory."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Path]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let rel_path = block.param(ParamName::Path).unwrap_or_default();

        if let Some(denied) =
            request_approval(ctx, self.name(), &format!("Read file: {}", rel_path), false).await
        {
            return denied;
        }

        if ctx.cancel.is_cancelled() {
            return ToolResponse::error("Operation cancelled");
        }

        let path = ctx.resolve(rel_path);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResponse::error(format!("File not found: {}", rel_path));
            }
            Err(e) => {
                return ToolResponse::error(format!("Failed to read {}: {}", rel_path, e));
            }
        };

        ctx.tracker.lock().track_read(rel_path);

        ToolResponse::text(content)
    }
}
