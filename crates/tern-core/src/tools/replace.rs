//! Targeted file editing with SEARCH/REPLACE blocks

use async_trait::async_trait;
use tokio::fs;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};
use crate::tools::write::{generate_diff, saved_response};

const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
const SEPARATOR: &str = "=======";
const REPLACE_MARKER: &str = ">>>>>>> REPLACE";

/// Tool for replacing exact sections of a file
pub struct ReplaceInFileTool;

#[async_trait]
impl Tool for ReplaceInFileTool {
    fn name(&self) -> ToolName {
        ToolName::ReplaceInFile
    }

    fn description(&self) -> &str {
        "Edit a file by applying SEARCH/REPLACE blocks. Each SEARCH section must match the file content exactly; blocks apply in order and the edit is atomic."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Path, ParamName::Diff]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let rel_path = block.param(ParamName::Path).unwrap_or_default();
        let diff = block.param(ParamName::Diff).unwrap_or_default();

        let edits = match parse_search_replace(diff) {
            Ok(edits) => edits,
            Err(e) => return ToolResponse::error(e),
        };
        if edits.is_empty() {
            return ToolResponse::error(
                "No SEARCH/REPLACE blocks found in the diff parameter.".to_string(),
            );
        }

        let path = ctx.resolve(rel_path);
        let original = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResponse::error(format!("File not found: {}", rel_path));
            }
            Err(e) => {
                return ToolResponse::error(format!("Failed to read {}: {}", rel_path, e));
            }
        };

        // All blocks must land before anything is written
        let mut updated = original.clone();
        for (i, (search, replace)) in edits.iter().enumerate() {
            if !updated.contains(search.as_str()) {
                return ToolResponse::error(format!(
                    "The SEARCH content in block {} does not match anything in {}. No changes were applied; the SEARCH section must match the file exactly, including whitespace.",
                    i + 1,
                    rel_path
                ));
            }
            updated = updated.replacen(search.as_str(), replace.as_str(), 1);
        }

        let preview = format!(
            "Edit {}:\n{}",
            rel_path,
            generate_diff(&original, &updated)
        );
        if let Some(denied) = request_approval(ctx, self.name(), &preview, false).await {
            return denied;
        }

        if ctx.cancel.is_cancelled() {
            return ToolResponse::error("Operation cancelled");
        }

        if let Err(e) = fs::write(&path, &updated).await {
            return ToolResponse::error(format!("Failed to write {}: {}", rel_path, e));
        }

        ctx.state.lock().did_edit_file = true;
        ctx.tracker.lock().mark_file_edited_by_agent(rel_path);

        ToolResponse::text(saved_response(rel_path, &updated))
    }
}

/// Parse `<<<<<<< SEARCH` / `=======` / `>>>>>>> REPLACE` blocks in document
/// order.
fn parse_search_replace(diff: &str) -> Result<Vec<(String, String)>, String> {
    enum S {
        Outside,
        Search,
        Replace,
    }
    let mut state = S::Outside;
    let mut search: Vec<&str> = vec![];
    let mut replace: Vec<&str> = vec![];
    let mut out = Vec::new();

    for line in diff.lines() {
        let trimmed = line.trim_end();
        match state {
            S::Outside => {
                if trimmed == SEARCH_MARKER {
                    state = S::Search;
                    search.clear();
                    replace.clear();
                }
            }
            S::Search => {
                if trimmed == SEPARATOR {
                    state = S::Replace;
                } else if trimmed == REPLACE_MARKER {
                    return Err(
                        "Malformed SEARCH/REPLACE block: missing ======= separator.".to_string()
                    );
                } else {
                    search.push(line);
                }
            }
            S::Replace => {
                if trimmed == REPLACE_MARKER {
                    out.push((search.join("\n"), replace.join("\n")));
                    state = S::Outside;
                } else {
                    replace.push(line);
                }
            }
        }
    }

    match state {
        S::Outside => Ok(out),
        _ => Err("Malformed SEARCH/REPLACE block: unterminated block.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_context_in, make_tool_block};

    fn diff_of(blocks: &[(&str, &str)]) -> String {
        blocks
            .iter()
            .map(|(s, r)| format!("{}\n{}\n{}\n{}\n{}", SEARCH_MARKER, s, SEPARATOR, r, REPLACE_MARKER))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_single_block() {
        let diff = diff_of(&[("old line", "new line")]);
        let edits = parse_search_replace(&diff).unwrap();
        assert_eq!(edits, vec![("old line".to_string(), "new line".to_string())]);
    }

    #[test]
    fn test_parse_multiple_blocks_in_order() {
        let diff = diff_of(&[("a", "b"), ("c", "d")]);
        let edits = parse_search_replace(&diff).unwrap();
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].0, "a");
        assert_eq!(edits[1].1, "d");
    }

    #[test]
    fn test_parse_unterminated_block_errors() {
        let diff = format!("{}\nx\n{}\ny", SEARCH_MARKER, SEPARATOR);
        assert!(parse_search_replace(&diff).is_err());
    }

    #[test]
    fn test_parse_missing_separator_errors() {
        let diff = format!("{}\nx\n{}", SEARCH_MARKER, REPLACE_MARKER);
        assert!(parse_search_replace(&diff).is_err());
    }

    #[tokio::test]
    async fn test_replace_applies_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "one two three").unwrap();
        let ctx = make_context_in(dir.path().to_path_buf());

        let diff = diff_of(&[("one", "1"), ("three", "3")]);
        let block = make_tool_block(
            ToolName::ReplaceInFile,
            &[(ParamName::Path, "f.txt"), (ParamName::Diff, diff.as_str())],
        );
        let resp = ReplaceInFileTool.execute(&block, &ctx).await;

        assert!(!resp.is_error, "{}", resp.text_content());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "1 two 3"
        );
    }

    #[tokio::test]
    async fn test_replace_first_occurrence_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "dup dup").unwrap();
        let ctx = make_context_in(dir.path().to_path_buf());

        let diff = diff_of(&[("dup", "uniq")]);
        let block = make_tool_block(
            ToolName::ReplaceInFile,
            &[(ParamName::Path, "f.txt"), (ParamName::Diff, diff.as_str())],
        );
        ReplaceInFileTool.execute(&block, &ctx).await;
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "uniq dup"
        );
    }

    #[tokio::test]
    async fn test_replace_atomic_on_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "alpha beta").unwrap();
        let ctx = make_context_in(dir.path().to_path_buf());

        // first block matches, second misses; nothing may be written
        let diff = diff_of(&[("alpha", "A"), ("gamma", "G")]);
        let block = make_tool_block(
            ToolName::ReplaceInFile,
            &[(ParamName::Path, "f.txt"), (ParamName::Diff, diff.as_str())],
        );
        let resp = ReplaceInFileTool.execute(&block, &ctx).await;

        assert!(resp.is_error);
        assert!(resp.text_content().contains("does not match"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "alpha beta"
        );
        assert!(!ctx.state.lock().did_edit_file);
    }
}
