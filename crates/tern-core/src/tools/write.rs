//! File writing tool

use async_trait::async_trait;
use similar::{ChangeTag, TextDiff};
use tokio::fs;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};

/// Tool for writing complete file contents
pub struct WriteToFileTool;

#[async_trait]
impl Tool for WriteToFileTool {
    fn name(&self) -> ToolName {
        ToolName::WriteToFile
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it (with parent directories) or overwriting it. The content parameter is written verbatim."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Path, ParamName::Content]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let rel_path = block.param(ParamName::Path).unwrap_or_default();
        let content = block.param(ParamName::Content).unwrap_or_default();

        let path = ctx.resolve(rel_path);
        let existing = fs::read_to_string(&path).await.ok();

        // Present a diff preview when overwriting
        let preview = match &existing {
            Some(old) => format!(
                "Overwrite {} with changes:\n{}",
                rel_path,
                generate_diff(old, content)
            ),
            None => format!("Create new file {} ({} bytes)", rel_path, content.len()),
        };
        if let Some(denied) = request_approval(ctx, self.name(), &preview, false).await {
            return denied;
        }

        if ctx.cancel.is_cancelled() {
            return ToolResponse::error("Operation cancelled");
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent).await {
                    return ToolResponse::error(format!(
                        "Failed to create directory for {}: {}",
                        rel_path, e
                    ));
                }
            }
        }

        if let Err(e) = fs::write(&path, content).await {
            return ToolResponse::error(format!("Failed to write {}: {}", rel_path, e));
        }

        ctx.state.lock().did_edit_file = true;
        ctx.tracker.lock().mark_file_edited_by_agent(rel_path);

        ToolResponse::text(saved_response(rel_path, content))
    }
}

/// The saved-file response carries the final content so later turns can be
/// deduplicated against it.
pub(crate) fn saved_response(rel_path: &str, content: &str) -> String {
    format!(
        "The content was successfully saved to {}.\n\n<final_file_content path=\"{}\">\n{}\n</final_file_content>",
        rel_path, rel_path, content
    )
}

/// Generate a unified diff string, capped to keep previews readable
pub(crate) fn generate_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = Vec::new();

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        output.push(format!("{}{}", sign, change));
    }

    if output.len() > 50 {
        output.truncate(50);
        output.push("... (diff truncated)".to_string());
    }

    output.join("")
}
