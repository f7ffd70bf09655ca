//! Regex content search via an external ripgrep-compatible binary

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};

/// Cap on returned matches
const MAX_MATCHES: usize = 300;
/// Cap on formatted output size
const MAX_OUTPUT_BYTES: usize = 256 * 1024;
/// Search process wall clock
const SEARCH_TIMEOUT_SECS: u64 = 30;

/// Tool for searching file contents by regex
pub struct SearchFilesTool;

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> ToolName {
        ToolName::SearchFiles
    }

    fn description(&self) -> &str {
        "Search files under a directory for a regex pattern, optionally filtered by a glob. Returns matching lines with file paths and line numbers."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Path, ParamName::Regex]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let rel_path = block.param(ParamName::Path).unwrap_or_default();
        let regex = block.param(ParamName::Regex).unwrap_or_default();
        let file_pattern = block.param(ParamName::FilePattern);

        let preview = format!("Search '{}' in {}", regex, rel_path);
        if let Some(denied) = request_approval(ctx, self.name(), &preview, false).await {
            return denied;
        }

        if ctx.cancel.is_cancelled() {
            return ToolResponse::error("Operation cancelled");
        }

        let binary = ctx
            .search_binary
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("rg"));

        let mut cmd = Command::new(&binary);
        cmd.arg("--line-number")
            .arg("--no-heading")
            .arg("--color")
            .arg("never")
            .arg("--max-count")
            .arg(MAX_MATCHES.to_string())
            .arg("-e")
            .arg(regex);
        if let Some(pattern) = file_pattern {
            cmd.arg("--glob").arg(pattern);
        }
        cmd.arg(ctx.resolve(rel_path))
            .current_dir(&ctx.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResponse::error(format!(
                    "Search binary '{}' not found. Install ripgrep or configure search_binary.",
                    binary.display()
                ));
            }
            Err(e) => return ToolResponse::error(format!("Failed to spawn search: {}", e)),
        };

        let output = match tokio::time::timeout(
            std::time::Duration::from_secs(SEARCH_TIMEOUT_SECS),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => return ToolResponse::error(format!("Search failed: {}", e)),
            Err(_) => {
                return ToolResponse::error(format!(
                    "Search timed out after {} seconds",
                    SEARCH_TIMEOUT_SECS
                ));
            }
        };

        // ripgrep exits 1 when nothing matched
        if output.status.code() == Some(1) {
            return ToolResponse::text("No results found");
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return ToolResponse::error(format!("Search failed: {}", stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        ToolResponse::text(format_matches(&stdout))
    }
}

/// Shape raw binary output under the match and byte caps, with a terminal
/// notice when truncated.
fn format_matches(raw: &str) -> String {
    let mut out = String::new();
    let mut shown = 0usize;
    let mut truncated = false;

    for line in raw.lines() {
        if shown >= MAX_MATCHES || out.len() + line.len() + 1 > MAX_OUTPUT_BYTES {
            truncated = true;
            break;
        }
        out.push_str(line);
        out.push('\n');
        shown += 1;
    }

    if out.is_empty() {
        return "No results found".to_string();
    }
    if truncated {
        out.push_str(&format!(
            "\n(Results truncated: showing first {} matches. Narrow the search with a more specific pattern or path.)",
            shown
        ));
    }
    out.trim_end().to_string()
}
